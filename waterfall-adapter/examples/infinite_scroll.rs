// Example: a simulated feed driving the controller through timer ticks.
use std::sync::{Arc, Mutex};

use waterfall::{LayoutOptions, LoadRequest, Measure, ViewportProbe};
use waterfall_adapter::{Controller, ControllerOptions};

const PAGE: u64 = 8;
const TOTAL: u64 = 30;
const VIEWPORT: u32 = 900;

fn main() {
    let inbox: Arc<Mutex<Vec<LoadRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&inbox);
    let mut c: Controller<u64> = Controller::new(
        ControllerOptions::new().with_layout(LayoutOptions::new().with_min_column_width(240)),
    )
    .with_handler(move |req: LoadRequest| {
        if let Ok(mut inbox) = sink.lock() {
            inbox.push(req);
        }
    });

    let measure = |k: &u64| Measure::resolved(150 + (*k as u32 % 5) * 40);
    let mut items: Vec<u64> = Vec::new();
    c.initialize(1000, 0, measure);

    let mut now_ms = 0u64;
    while now_ms <= 10_000 {
        let content_height = c.engine().container_height();
        let probe = ViewportProbe {
            viewport_height: VIEWPORT,
            sentinel_offset: content_height as i64,
            content_height,
        };
        let tick = c.tick(now_ms, probe, measure);
        if tick.needs_frame {
            c.on_frame(measure);
        }

        let pending: Vec<LoadRequest> = inbox
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default();
        for req in pending {
            let start = items.len() as u64;
            let end = (start + PAGE).min(TOTAL);
            items.extend(start..end);
            c.on_items_changed(&items, measure);
            let completion = c.complete(req.ticket, end < TOTAL, now_ms);
            println!(
                "t={now_ms}ms ticket={} items={} height={} -> {completion:?}",
                req.ticket.0,
                items.len(),
                c.engine().container_height()
            );
        }
        now_ms += 50;
    }

    println!("final: items={} has_more={}", items.len(), c.has_more());
}
