// Example: provisional heights corrected in one batched flush.
use std::collections::HashMap;

use waterfall::{LayoutOptions, Measure, Waterfall};

fn main() {
    let mut heights: HashMap<u64, Measure> = HashMap::new();
    for k in 0..6u64 {
        // Images still loading: the host reports a placeholder height.
        heights.insert(k, Measure::pending(0));
    }

    let mut w: Waterfall<u64> = Waterfall::new(LayoutOptions::new().with_column_count(Some(2)));
    w.set_container_width(420, |_| Measure::default());
    w.ingest(&[0, 1, 2, 3, 4, 5], |k| heights[k]);
    println!("provisional height={}", w.container_height());

    // Images finish in arbitrary order; every resolution folds into one frame.
    for k in [3u64, 0, 5] {
        heights.insert(k, Measure::resolved(90 + k as u32 * 20));
        let needs_frame = w.on_content_resolved(&k);
        println!("resolved {k}: request_frame={needs_frame}");
    }

    let report = w.flush(|k| heights[k]);
    println!("flush={report:?}");
    println!("snapshot={:?}", w.snapshot());
}
