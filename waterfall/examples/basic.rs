// Example: lay out a batch of cards and inspect the column state.
use waterfall::{LayoutOptions, Measure, Waterfall};

fn main() {
    let mut w: Waterfall<u64> = Waterfall::new(LayoutOptions::new().with_min_column_width(220));
    w.set_container_width(1000, |_| Measure::default());

    let keys: Vec<u64> = (0..12).collect();
    let outcome = w.ingest(&keys, |k| Measure::resolved(120 + (*k as u32 * 37) % 180));
    println!("ingest={outcome:?}");
    println!("columns={} widths={:?}", w.column_count(), w.column_widths());
    println!("column_heights={:?}", w.column_heights());
    println!("container_height={}", w.container_height());

    let mut items = Vec::new();
    w.collect_items(&mut items);
    items.sort_by_key(|(k, _)| *k);
    for (key, placement) in items.iter().take(4) {
        println!("item {key}: column={} rect={:?}", placement.column, placement.rect);
    }
}
