#![no_main]

use cardgrid_runtime::{StreamError, StreamingSnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 4096 {
        return;
    }

    // Each line is one chunk; bad chunks must leave the snapshot untouched.
    let mut snapshot = StreamingSnapshot::new();
    let mut sections = 0;
    let mut entered = 0;
    for line in text.lines() {
        let before = snapshot.card();
        match snapshot.merge_json(line) {
            Ok(_) => {}
            Err(StreamError::MalformedChunk(_) | StreamError::DuplicateSectionId(_)) => {
                assert_eq!(snapshot.card(), before);
            }
            Err(StreamError::InvalidTransition { .. }) => unreachable!("merge never transitions"),
        }
        assert!(snapshot.section_count() >= sections);
        assert!(snapshot.entered_units().len() >= entered);
        sections = snapshot.section_count();
        entered = snapshot.entered_units().len();
    }
});
