#![no_main]

//! Fuzz target for line edits on a parsed Dockerfile.
//!
//! Edits may be rejected, but must never panic, and a restored snapshot
//! must give back the exact text it was taken from.

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use dockfix_edit::Dockerfile;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Edit {
    Set(u8, String),
    Insert(u8, String),
    Delete(u8),
    Replace(u8, u8, Vec<String>),
}

#[derive(Debug, Arbitrary)]
struct Input {
    contents: String,
    edits: Vec<Edit>,
}

fuzz_target!(|input: Input| {
    let Some(date) = NaiveDate::from_ymd_opt(2022, 6, 1) else {
        return;
    };
    let Ok(mut doc) = Dockerfile::from_contents("Dockerfile", &input.contents, date) else {
        return;
    };

    let before = doc.contents();
    let snapshot = doc.snapshot();
    for edit in input.edits {
        let _ = match edit {
            Edit::Set(line, text) => doc.set_line(line.into(), text),
            Edit::Insert(line, text) => doc.insert_at(line.into(), text),
            Edit::Delete(line) => doc.delete_at(line.into()),
            Edit::Replace(start, end, lines) => doc.replace_range(start.into(), end.into(), lines),
        };
        let _ = doc.reparse();
    }
    let _ = doc.restore(snapshot);
    assert_eq!(doc.contents(), before);
});
