#![no_main]

//! Fuzz target for Dockerfile parsing.
//!
//! Any text that parses must parse again, unchanged, after being rendered.

use chrono::NaiveDate;
use dockfix_edit::Dockerfile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Some(date) = NaiveDate::from_ymd_opt(2022, 6, 1) else {
        return;
    };

    let Ok(doc) = Dockerfile::from_contents("Dockerfile", s, date) else {
        return;
    };
    let rendered = doc.contents();
    let again = Dockerfile::from_contents("Dockerfile", &rendered, date).expect("rendered file parses");
    assert_eq!(again.contents(), rendered);

    for line in 1..=doc.line_count() {
        let _ = doc.command_containing(line);
        let _ = doc.base_image_of(line);
    }
});
