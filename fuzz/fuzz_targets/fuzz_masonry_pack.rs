#![no_main]

use arbitrary::Arbitrary;
use cardgrid_layout::{GridMetrics, PackItem, pack};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    container_width: f64,
    min_column_width: f64,
    max_columns: u8,
    gap: f64,
    items: Vec<(u8, f64)>,
}

fuzz_target!(|input: Input| {
    let metrics = GridMetrics {
        min_column_width: input.min_column_width,
        max_columns: usize::from(input.max_columns),
        gap: input.gap,
    };
    let items: Vec<PackItem> = input
        .items
        .iter()
        .take(256)
        .enumerate()
        .map(|(i, &(span, height))| PackItem::new(format!("s{i}"), usize::from(span), height))
        .collect();

    // Contract violations are reported, never panicked on.
    let Ok(packing) = pack(&items, input.container_width, &metrics) else {
        return;
    };

    assert!(packing.column_count >= 1);
    assert!(packing.column_count <= metrics.max_columns);
    assert_eq!(packing.boxes.len(), items.len());
    for (i, a) in packing.boxes.iter().enumerate() {
        assert!(a.column + a.column_span <= packing.column_count);
        for b in &packing.boxes[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }

    // Idempotent.
    let again = pack(&items, input.container_width, &metrics).expect("second pass");
    assert_eq!(packing, again);
});
