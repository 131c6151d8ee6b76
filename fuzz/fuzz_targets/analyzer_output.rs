#![no_main]

//! Fuzz target for hadolint JSON output parsing.

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(defects) = dockfix_analyzer::parse_findings(s) {
        for defect in &defects {
            let _ = defect.is_fatal();
        }
    }
});
