#![no_main]

//! Fuzz target for registry payload deserialization.

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(tag) = serde_json::from_str::<dockfix_registry::ImageTag>(s) {
        let _ = tag.pushed_on();
        let _ = tag.digests_for("amd64", "linux").count();
    }
    let _ = serde_json::from_str::<dockfix_registry::SeriesInfo>(s);
    let _ = serde_json::from_str::<dockfix_registry::BinaryPublication>(s);
    let _ = serde_json::from_str::<Vec<dockfix_registry::ImageTag>>(s);
});
