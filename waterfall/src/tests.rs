use crate::*;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 11
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        debug_assert!(start < end_exclusive);
        start + (self.next_u64() % (end_exclusive - start) as u64) as u32
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        start + (self.next_u64() % (end_exclusive - start) as u64) as usize
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Host-side stand-in: rendered height and resolution state per item.
#[derive(Default)]
struct Host {
    items: HashMap<u64, Measure>,
}

impl Host {
    fn set(&mut self, key: u64, measure: Measure) {
        self.items.insert(key, measure);
    }

    fn measure(&self) -> impl FnMut(&u64) -> Measure + '_ {
        move |k| self.items.get(k).copied().unwrap_or_default()
    }
}

fn single_column(row_gap: u32) -> Waterfall<u64> {
    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(1))
            .with_row_gap(row_gap),
    );
    w.set_container_width(300, |_| Measure::default());
    w
}

fn top_of(w: &Waterfall<u64>, key: u64) -> u64 {
    w.item_rect(&key).unwrap().top
}

/// Items in every column must sit back to back, and each column must end one gap below its
/// last item.
fn assert_columns_packed(w: &Waterfall<u64>) {
    let gap = w.options().row_gap as u64;
    let mut per_column: Vec<Vec<Rect>> = (0..w.column_count()).map(|_| Vec::new()).collect();
    w.for_each_item(|_, p| per_column[p.column].push(p.rect));
    for (column, rects) in per_column.iter_mut().enumerate() {
        rects.sort_by_key(|r| r.top);
        let mut expected_top = 0u64;
        for r in rects.iter() {
            assert_eq!(r.top, expected_top, "column {column}");
            expected_top = r.bottom() + gap;
        }
        assert_eq!(w.column_heights()[column], expected_top, "column {column}");
    }
}

#[test]
fn equal_heights_fill_columns_round_robin() {
    let mut host = Host::default();
    let keys: Vec<u64> = (0..9).collect();
    for &k in &keys {
        host.set(k, Measure::resolved(100));
    }

    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(3))
            .with_gaps(10, 10),
    );
    w.set_container_width(620, host.measure());
    assert_eq!(
        w.ingest(&keys, host.measure()),
        IngestOutcome::Initial { placed: 9 }
    );

    for &k in &keys {
        let p = w.item(&k).unwrap();
        assert_eq!(p.column, (k % 3) as usize);
        assert_eq!(p.rect.top, (k / 3) * 110);
        assert_eq!(p.state, HeightState::Final);
    }
    assert_eq!(w.column_heights(), &[330, 330, 330]);
    assert_eq!(w.container_height(), 330);
}

#[test]
fn shortest_column_wins_and_ties_go_left() {
    let mut t = ColumnTracker::new(4);
    assert_eq!(t.shortest(), 0);
    t.grow(0, 50);
    t.grow(1, 20);
    t.grow(2, 20);
    t.grow(3, 30);
    assert_eq!(t.shortest(), 1);
    t.apply_delta(1, -15);
    assert_eq!(t.height(1), Some(5));
    t.apply_delta(1, -100);
    assert_eq!(t.height(1), Some(0));
    assert_eq!(t.max_height(), 50);

    t.reset(0);
    assert_eq!(t.len(), 1);
    assert_eq!(t.heights(), &[0]);
}

#[test]
fn uneven_column_widths_hand_out_the_remainder_left_to_right() {
    let g = ColumnGeometry::new(1000, 3, 10);
    assert_eq!(g.widths(), &[327, 327, 326]);
    assert_eq!(g.left(0), 0);
    assert_eq!(g.left(1), 337);
    assert_eq!(g.left(2), 674);
    assert_eq!(g.left(2) + g.width(2), 1000);

    let mut host = Host::default();
    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(3))
            .with_column_gap(10),
    );
    for k in 0..3 {
        host.set(k, Measure::resolved(40));
    }
    w.set_container_width(1000, host.measure());
    w.ingest(&[0, 1, 2], host.measure());
    assert_eq!(
        w.item_rect(&2),
        Some(Rect {
            left: 674,
            top: 0,
            width: 326,
            height: 40,
        })
    );
}

#[test]
fn gaps_wider_than_the_container_leave_zero_width_columns() {
    assert_eq!(column_widths(20, 5, 10), [0, 0, 0, 0, 0]);
    assert_eq!(column_widths(40, 5, 10), [0, 0, 0, 0, 0]);
    assert_eq!(column_widths(45, 5, 10), [1, 1, 1, 1, 1]);

    let g = ColumnGeometry::new(20, 5, 10);
    assert_eq!(g.len(), 5);
    assert_eq!(g.left(4), 40);
}

#[test]
fn property_column_widths_sum_to_container_width() {
    for seed in [1u64, 2, 3, 7, 42, 1234] {
        let mut rng = Lcg::new(seed);
        for _ in 0..200 {
            let count = rng.gen_range_usize(1, 16);
            let gap = rng.gen_range_u32(0, 40);
            let min_width = gap * (count as u32 - 1);
            let width = rng.gen_range_u32(min_width, min_width + 4000);

            let widths = column_widths(width, count, gap);
            assert_eq!(widths.len(), count);
            let sum: u64 = widths.iter().map(|&w| w as u64).sum();
            assert_eq!(sum + gap as u64 * (count as u64 - 1), width as u64);

            let max = *widths.iter().max().unwrap();
            let min = *widths.iter().min().unwrap();
            assert!(max - min <= 1);
            assert!(widths.windows(2).all(|p| p[0] >= p[1]));
        }
    }
}

#[test]
fn column_count_is_derived_from_width_and_floored_to_one() {
    assert_eq!(column_count_for(1000, 200, 0), 5);
    assert_eq!(column_count_for(1000, 200, 10), 4);
    assert_eq!(column_count_for(830, 200, 10), 4);
    assert_eq!(column_count_for(829, 200, 10), 3);
    assert_eq!(column_count_for(100, 200, 10), 1);
    assert_eq!(column_count_for(0, 0, 0), 1);

    let opts = LayoutOptions::new().with_column_count(Some(0));
    assert_eq!(opts.resolve_column_count(5000), 1);
    let opts = LayoutOptions::new().with_column_count(Some(6));
    assert_eq!(opts.resolve_column_count(10), 6);
}

#[test]
fn unresolved_content_reserves_a_provisional_height() {
    let mut host = Host::default();
    host.set(1, Measure::pending(0));
    host.set(2, Measure::pending(80));
    host.set(3, Measure::resolved(0));

    let mut w = single_column(10);
    w.ingest(&[1, 2, 3], host.measure());

    let p1 = w.item(&1).unwrap();
    assert!(p1.is_provisional());
    assert_eq!(p1.rect.height, 200);
    let p2 = w.item(&2).unwrap();
    assert!(p2.is_provisional());
    assert_eq!(p2.rect.top, 210);
    assert_eq!(p2.rect.height, 80);

    // A resolved item that rendered nothing takes no space.
    let p3 = w.item(&3).unwrap();
    assert_eq!(p3.rect.top, 300);
    assert_eq!(w.column_heights(), &[300]);
    assert_eq!(w.pending_len(), 0);
}

#[test]
fn reconciliation_applies_deltas_in_layout_order() {
    for resolve_order in [[1u64, 2], [2, 1]] {
        let mut host = Host::default();
        host.set(1, Measure::pending(200));
        host.set(2, Measure::pending(150));

        let mut w = single_column(50);
        w.ingest(&[1, 2], host.measure());
        assert_eq!(top_of(&w, 1), 0);
        assert_eq!(top_of(&w, 2), 250);
        assert_eq!(w.container_height(), 450);

        host.set(1, Measure::resolved(300));
        host.set(2, Measure::resolved(100));
        for k in resolve_order {
            w.on_content_resolved(&k);
        }
        let report = w.flush(host.measure());
        assert_eq!(report.processed, 2);
        assert_eq!(report.adjusted, 2);
        assert_eq!(report.container_height, Some(500));
        assert!(!report.reschedule);

        assert_eq!(top_of(&w, 1), 0);
        assert_eq!(top_of(&w, 2), 350);
        assert_eq!(w.item_rect(&2).unwrap().height, 100);
        assert_eq!(w.column_heights(), &[500]);
        assert!(!w.item(&1).unwrap().is_provisional());
        assert_columns_packed(&w);
    }
}

#[test]
fn corrections_only_shift_the_same_column() {
    let mut host = Host::default();
    for k in 0..4 {
        host.set(k, Measure::pending(100));
    }
    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(2))
            .with_gaps(10, 0),
    );
    w.set_container_width(400, host.measure());
    w.ingest(&[0, 1, 2, 3], host.measure());
    assert_eq!(w.item(&2).unwrap().column, 0);
    assert_eq!(w.item(&3).unwrap().column, 1);

    host.set(0, Measure::resolved(160));
    w.on_content_resolved(&0);
    w.flush(host.measure());

    assert_eq!(top_of(&w, 2), 170);
    assert_eq!(top_of(&w, 3), 110);
    assert_eq!(w.column_heights(), &[280, 220]);
    assert_eq!(w.container_height(), 280);
}

#[test]
fn sub_threshold_deltas_are_ignored() {
    let mut host = Host::default();
    host.set(1, Measure::pending(200));
    host.set(2, Measure::pending(100));
    let mut w = single_column(10);
    w.ingest(&[1, 2], host.measure());

    host.set(1, Measure::resolved(201));
    w.on_content_resolved(&1);
    let report = w.flush(host.measure());
    assert_eq!(report.processed, 1);
    assert_eq!(report.adjusted, 0);
    assert_eq!(top_of(&w, 2), 210);
    assert_eq!(w.item_rect(&1).unwrap().height, 200);
    assert_eq!(w.item(&1).unwrap().state, HeightState::Final);
}

#[test]
fn flush_requests_coalesce_and_duplicate_adjustments_collapse() {
    let mut host = Host::default();
    for k in 0..3 {
        host.set(k, Measure::pending(50));
    }
    let mut w = single_column(0);
    w.ingest(&[0, 1, 2], host.measure());

    assert!(!w.is_flush_scheduled());
    assert!(w.on_content_resolved(&0));
    assert!(!w.on_content_resolved(&0));
    assert!(!w.on_content_resolved(&1));
    assert!(w.is_flush_scheduled());
    assert_eq!(w.pending_len(), 2);

    host.set(0, Measure::resolved(70));
    let report = w.flush(host.measure());
    assert_eq!(report.processed, 2);
    assert!(!w.is_flush_scheduled());

    // Nothing scheduled: a second call in the same frame is a no-op.
    assert_eq!(w.flush(host.measure()), FlushReport::default());

    // A later content change after reconciliation queues a fresh entry.
    host.set(0, Measure::resolved(90));
    assert!(w.on_content_resolved(&0));
    assert_eq!(
        w.pending_adjustment(&0),
        Some(PendingAdjustment {
            column: 0,
            committed_top: 0,
            estimated_height: 70,
        })
    );
    w.flush(host.measure());
    assert_eq!(top_of(&w, 1), 90);
    assert_eq!(top_of(&w, 2), 140);
}

#[test]
fn unknown_items_do_not_schedule_flushes() {
    let mut w = single_column(10);
    assert!(!w.on_content_resolved(&99));
    assert!(!w.is_flush_scheduled());
}

#[test]
fn property_container_height_tracks_tallest_column() {
    for seed in [3u64, 5, 8, 13, 21, 99] {
        let mut rng = Lcg::new(seed);
        let mut host = Host::default();
        let columns = rng.gen_range_usize(1, 6);
        let mut w = Waterfall::new(
            LayoutOptions::new()
                .with_column_count(Some(columns))
                .with_gaps(rng.gen_range_u32(0, 20), 8),
        );
        w.set_container_width(1200, host.measure());

        let mut keys: Vec<u64> = Vec::new();
        for round in 0..12u64 {
            for i in 0..rng.gen_range_usize(1, 8) {
                let key = round * 100 + i as u64;
                let height = rng.gen_range_u32(1, 400);
                let m = if rng.gen_bool() {
                    Measure::resolved(height)
                } else {
                    Measure::pending(if rng.gen_bool() { height } else { 0 })
                };
                host.set(key, m);
                keys.push(key);
            }
            w.ingest(&keys, host.measure());
            let snapshot = w.snapshot();
            assert_eq!(snapshot.column_count(), columns);
            assert_eq!(
                snapshot.container_height,
                snapshot.column_heights.iter().copied().max().unwrap()
            );

            for _ in 0..rng.gen_range_usize(0, 6) {
                let key = keys[rng.gen_range_usize(0, keys.len())];
                host.set(key, Measure::resolved(rng.gen_range_u32(1, 500)));
                w.on_content_resolved(&key);
            }
            if rng.gen_bool() {
                w.flush(host.measure());
                assert_eq!(w.pending_len(), 0);
            }
            assert_columns_packed(&w);
            assert_eq!(w.container_height(), *w.column_heights().iter().max().unwrap());
        }
    }
}

#[test]
fn relayout_is_idempotent() {
    let mut rng = Lcg::new(77);
    let mut host = Host::default();
    let keys: Vec<u64> = (0..40).collect();
    for &k in &keys {
        let h = rng.gen_range_u32(10, 300);
        host.set(
            k,
            if rng.gen_bool() {
                Measure::resolved(h)
            } else {
                Measure::pending(h)
            },
        );
    }
    let mut w = Waterfall::new(LayoutOptions::new().with_min_column_width(150));
    w.set_container_width(800, host.measure());
    w.ingest(&keys, host.measure());

    let mut first = Vec::new();
    let mut second = Vec::new();
    assert!(w.relayout(host.measure()));
    w.collect_items(&mut first);
    let height = w.container_height();
    assert!(w.relayout(host.measure()));
    w.collect_items(&mut second);
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
    assert_eq!(w.container_height(), height);
}

#[test]
fn relayout_discards_pending_corrections() {
    let mut host = Host::default();
    host.set(1, Measure::pending(200));
    host.set(2, Measure::pending(100));
    let mut w = single_column(10);
    w.ingest(&[1, 2], host.measure());

    host.set(1, Measure::resolved(120));
    w.on_content_resolved(&1);
    assert!(w.relayout(host.measure()));
    assert_eq!(w.pending_len(), 0);
    assert!(!w.is_flush_scheduled());
    assert_eq!(top_of(&w, 2), 130);
    assert!(!w.item(&1).unwrap().is_provisional());
    assert!(w.item(&2).unwrap().is_provisional());
}

#[test]
fn zero_width_defers_layout_until_measured() {
    let mut host = Host::default();
    for k in 0..4 {
        host.set(k, Measure::resolved(50));
    }
    let mut w = Waterfall::new(LayoutOptions::new().with_column_count(Some(2)));
    assert_eq!(w.ingest(&[0, 1, 2, 3], host.measure()), IngestOutcome::Deferred);
    assert!(w.item(&0).is_none());
    assert!(!w.relayout(host.measure()));
    assert_eq!(w.place(9, Measure::resolved(10)), None);
    assert_eq!(w.len(), 5);
    host.set(9, Measure::resolved(10));

    assert!(w.set_container_width(400, host.measure()));
    assert!(w.is_laid_out());
    assert_eq!(w.item(&3).unwrap().column, 1);
    assert_eq!(top_of(&w, 9), 120);
    assert_eq!(w.container_height(), 130);
}

#[test]
fn ingest_distinguishes_first_and_incremental_batches() {
    let mut host = Host::default();
    for k in 0..6 {
        host.set(k, Measure::resolved(100));
    }
    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(2))
            .with_gaps(0, 0),
    );
    w.set_container_width(200, host.measure());
    assert_eq!(w.ingest(&[], host.measure()), IngestOutcome::Unchanged);
    assert_eq!(
        w.ingest(&[0, 1, 2], host.measure()),
        IngestOutcome::Initial { placed: 3 }
    );
    assert_eq!(
        w.ingest(&[0, 1, 2, 3, 4], host.measure()),
        IngestOutcome::Incremental { placed: 2 }
    );
    assert_eq!(w.ingest(&[0, 1, 2, 3, 4], host.measure()), IngestOutcome::Unchanged);
    assert_eq!(w.item(&3).unwrap().rect.top, 100);
    assert_eq!(w.item(&4).unwrap().rect.top, 200);
    assert_eq!(w.item(&4).unwrap().column, 0);

    let placed = w.place(5, host.items[&5]).unwrap();
    assert_eq!(placed.column, 1);
    assert_eq!(w.place(5, Measure::resolved(999)), Some(placed));
}

#[test]
fn width_changes_relayout_only_past_the_threshold() {
    let mut host = Host::default();
    for k in 0..5 {
        host.set(k, Measure::resolved(100));
    }
    let mut w = Waterfall::new(LayoutOptions::new().with_min_column_width(200).with_column_gap(0));
    w.set_container_width(600, host.measure());
    w.ingest(&[0, 1, 2, 3, 4], host.measure());
    assert_eq!(w.column_count(), 3);

    assert!(!w.set_container_width(601, host.measure()));
    assert_eq!(w.column_widths(), &[200, 200, 200]);
    assert!(w.set_container_width(610, host.measure()));
    assert_eq!(w.column_widths(), &[204, 203, 203]);
    assert!(w.set_container_width(400, host.measure()));
    assert_eq!(w.column_count(), 2);
    assert_eq!(w.container_height(), 330);

    assert!(!w.set_container_width(0, host.measure()));
    assert!(!w.is_laid_out());
    assert!(w.set_container_width(400, host.measure()));
    assert!(w.is_laid_out());
}

#[test]
fn option_changes_trigger_relayout_when_items_exist() {
    let mut host = Host::default();
    for k in 0..4 {
        host.set(k, Measure::resolved(100));
    }
    let mut w = Waterfall::new(LayoutOptions::new().with_column_count(Some(2)));
    w.set_container_width(410, host.measure());

    // No items: only the columns are reset.
    assert!(!w.update_options(|o| o.column_count = Some(4), host.measure()));
    assert_eq!(w.column_count(), 4);

    w.ingest(&[0, 1, 2, 3], host.measure());
    assert_eq!(w.container_height(), 110);

    assert!(!w.update_options(|o| o.noise_threshold = 3, host.measure()));
    assert!(w.update_options(|o| o.row_gap = 20, host.measure()));
    assert_eq!(w.container_height(), 120);
    assert!(w.update_options(|o| o.column_count = Some(2), host.measure()));
    assert_eq!(w.container_height(), 240);
    assert!(w.update_options(|o| o.column_gap = 30, host.measure()));
    assert_eq!(w.item_rect(&1).unwrap().left, 220);
}

#[test]
fn remove_and_clear() {
    let mut host = Host::default();
    for k in 0..4 {
        host.set(k, Measure::resolved(100));
    }
    let mut w = Waterfall::new(
        LayoutOptions::new()
            .with_column_count(Some(2))
            .with_gaps(0, 0),
    );
    w.set_container_width(200, host.measure());
    w.ingest(&[0, 1, 2, 3], host.measure());

    assert!(w.remove(&0, host.measure()));
    assert!(!w.remove(&0, host.measure()));
    assert_eq!(w.len(), 3);
    assert_eq!(w.item(&1).unwrap().column, 0);
    assert_eq!(w.item(&3).unwrap().rect.top, 100);

    w.on_content_resolved(&1);
    w.clear();
    assert!(w.is_empty());
    assert_eq!(w.pending_len(), 0);
    assert!(!w.is_flush_scheduled());
    assert_eq!(w.column_heights(), &[0, 0]);
    assert_eq!(w.container_height(), 0);
    assert_eq!(
        w.ingest(&[7], |_| Measure::resolved(5)),
        IngestOutcome::Initial { placed: 1 }
    );
}

#[test]
fn height_changes_are_published_through_the_callback() {
    let last = Arc::new(AtomicU64::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let opts = LayoutOptions::new()
        .with_column_count(Some(1))
        .with_row_gap(0)
        .with_on_height_change({
            let last = Arc::clone(&last);
            let calls = Arc::clone(&calls);
            move |h| {
                last.store(h, Ordering::Relaxed);
                calls.fetch_add(1, Ordering::Relaxed);
            }
        });
    let mut w: Waterfall<u64> = Waterfall::new(opts);
    w.set_container_width(100, |_| Measure::default());
    w.place(1, Measure::pending(40));
    assert_eq!(last.load(Ordering::Relaxed), 40);

    w.on_content_resolved(&1);
    w.flush(|_| Measure::resolved(90));
    assert_eq!(last.load(Ordering::Relaxed), 90);
    assert_eq!(calls.load(Ordering::Relaxed), 2);

    // Same height: no republish.
    w.relayout(|_| Measure::resolved(90));
    assert_eq!(calls.load(Ordering::Relaxed), 2);

    let opts = w.options().clone().without_on_height_change();
    assert!(!w.set_options(opts, |_| Measure::resolved(90)));
    assert!(w.options().on_height_change.is_none());
    w.place(2, Measure::resolved(30));
    assert_eq!(w.container_height(), 120);
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn sentinel_triggers_are_debounced() {
    let mut o = LoadOrchestrator::default();
    let req = o.on_sentinel_visible(0, 0).unwrap();
    assert_eq!(req.current_count, 0);
    assert_eq!(o.phase(), LoadPhase::Loading);
    assert_eq!(o.on_sentinel_visible(200, 0), None);

    o.complete(req.ticket, true, 250, 0).unwrap();
    assert_eq!(o.on_sentinel_visible(400, 0), None);
    assert_eq!(o.on_sentinel_visible(749, 0), None);
    let next = o.on_sentinel_visible(750, 0).unwrap();
    assert_ne!(next.ticket, req.ticket);
    assert_eq!(o.state().last_request_ms, Some(750));
}

#[test]
fn exhausted_state_is_terminal_until_reset() {
    let mut o = LoadOrchestrator::default();
    let req = o.on_sentinel_visible(0, 0).unwrap();
    assert_eq!(
        o.complete(req.ticket, false, 10, 20),
        Ok(Completion::Exhausted)
    );
    assert_eq!(o.phase(), LoadPhase::Exhausted);
    assert!(!o.is_sentinel_attached());

    let visible = ViewportProbe {
        viewport_height: 800,
        sentinel_offset: 0,
        content_height: 0,
    };
    assert_eq!(o.on_sentinel_visible(10_000, 20), None);
    assert_eq!(o.poll(10_000, visible, 20), None);

    o.reset(20_000);
    assert_eq!(o.phase(), LoadPhase::Idle);
    assert!(o.is_sentinel_attached());
    assert_eq!(o.next_deadline(), Some(20_100));
    assert_eq!(o.poll(20_050, visible, 0), None);
    assert!(o.poll(20_100, visible, 0).is_some());
    // The re-check runs once.
    assert_eq!(o.next_deadline(), None);
}

#[test]
fn completion_without_growth_does_not_retry() {
    let mut o = LoadOrchestrator::default();
    let req = o.on_sentinel_visible(0, 10).unwrap();
    assert_eq!(
        o.complete(req.ticket, true, 100, 10),
        Ok(Completion::Idle {
            grew: false,
            follow_up_at: None,
        })
    );
    assert_eq!(o.next_deadline(), None);
    let underfilled = ViewportProbe {
        viewport_height: 800,
        sentinel_offset: 100,
        content_height: 100,
    };
    assert_eq!(o.poll(10_000, underfilled, 10), None);
    assert_eq!(o.phase(), LoadPhase::Idle);
}

#[test]
fn settle_check_tops_up_an_underfilled_viewport() {
    let opts = LoadOptions::new().with_debounce_ms(500).with_settle_delay_ms(100);
    let mut o = LoadOrchestrator::new(opts);
    let req = o.on_sentinel_visible(1_000, 0).unwrap();
    let completion = o.complete(req.ticket, true, 1_000, 6).unwrap();
    assert_eq!(
        completion,
        Completion::Idle {
            grew: true,
            follow_up_at: Some(1_500),
        }
    );

    let underfilled = ViewportProbe {
        viewport_height: 800,
        sentinel_offset: 5_000,
        content_height: 1_100,
    };
    assert_eq!(o.poll(1_499, underfilled, 6), None);
    let again = o.poll(1_500, underfilled, 6).unwrap();
    assert_eq!(again.current_count, 6);

    // Filled viewport with a far sentinel: the follow-up check does nothing.
    o.complete(again.ticket, true, 2_000, 12).unwrap();
    let filled = ViewportProbe {
        viewport_height: 800,
        sentinel_offset: 5_000,
        content_height: 4_000,
    };
    assert_eq!(o.poll(3_000, filled, 12), None);
    assert_eq!(o.next_deadline(), None);
    assert!(!o.is_loading());
}

#[test]
fn stale_and_unexpected_completions_are_rejected() {
    let mut o = LoadOrchestrator::default();
    assert_eq!(
        o.complete(LoadTicket(0), true, 0, 0),
        Err(LoadError::NotLoading)
    );

    let first = o.on_sentinel_visible(0, 0).unwrap();
    o.reset(10);
    assert_eq!(o.complete(first.ticket, true, 20, 5), Err(LoadError::NotLoading));

    let second = o.on_sentinel_visible(20, 0).unwrap();
    assert_eq!(
        o.complete(first.ticket, true, 30, 5),
        Err(LoadError::StaleTicket {
            ticket: first.ticket,
            current: second.ticket,
        })
    );
    assert!(o.is_loading());
    assert!(o.complete(second.ticket, true, 30, 5).is_ok());
}

#[test]
fn teardown_cancels_everything() {
    let mut o = LoadOrchestrator::default();
    o.arm(0);
    let req = o.on_sentinel_visible(0, 0).unwrap();
    o.teardown();
    assert!(o.is_torn_down());
    assert!(!o.is_loading());
    assert_eq!(o.next_deadline(), None);
    assert_eq!(o.complete(req.ticket, true, 10, 5), Err(LoadError::TornDown));
    assert_eq!(o.finish_loading(true, 10, 5), None);
    assert_eq!(o.on_sentinel_visible(5_000, 5), None);
    assert_eq!(o.poll(5_000, ViewportProbe::default(), 5), None);

    // Re-attaching starts over with fresh tickets.
    o.arm(6_000);
    assert!(!o.is_torn_down());
    assert!(o.is_sentinel_attached());
    let fresh = o.on_sentinel_visible(6_000, 5).unwrap();
    assert_ne!(fresh.ticket, req.ticket);
    assert_eq!(
        o.complete(req.ticket, true, 6_010, 5),
        Err(LoadError::StaleTicket {
            ticket: req.ticket,
            current: fresh.ticket,
        })
    );
}

#[test]
fn initial_check_only_loads_into_an_empty_grid() {
    let visible = ViewportProbe {
        viewport_height: 600,
        sentinel_offset: 700,
        content_height: 0,
    };

    let mut o = LoadOrchestrator::default();
    o.arm(0);
    assert_eq!(o.poll(99, visible, 0), None);
    assert!(o.poll(100, visible, 0).is_some());

    let mut o = LoadOrchestrator::default();
    o.arm(0);
    assert_eq!(o.poll(100, visible, 3), None);

    let hidden = ViewportProbe {
        sentinel_offset: 900,
        ..visible
    };
    let mut o = LoadOrchestrator::default();
    o.arm(0);
    assert_eq!(o.poll(100, hidden, 0), None);
}

#[test]
fn finish_loading_is_a_ticketless_completion() {
    let mut o = LoadOrchestrator::default();
    let req = o.on_sentinel_visible(0, 0).unwrap();
    assert_eq!(o.in_flight(), Some(req));
    assert!(matches!(
        o.finish_loading(true, 50, 4),
        Some(Completion::Idle { grew: true, .. })
    ));
    assert_eq!(o.in_flight(), None);

    // Nothing in flight: ignored.
    assert_eq!(o.finish_loading(false, 60, 4), None);
    assert_eq!(o.phase(), LoadPhase::Idle);

    let req = o.on_sentinel_visible(600, 4).unwrap();
    assert_eq!(o.finish_loading(false, 650, 4), Some(Completion::Exhausted));
    assert_eq!(o.phase(), LoadPhase::Exhausted);
    assert_eq!(o.complete(req.ticket, true, 660, 4), Err(LoadError::NotLoading));
}

#[test]
fn late_completions_cannot_leave_the_exhausted_state() {
    let mut o = LoadOrchestrator::default();
    let req = o.on_sentinel_visible(0, 0).unwrap();
    assert_eq!(o.complete(req.ticket, false, 10, 9), Ok(Completion::Exhausted));

    assert_eq!(o.finish_loading(true, 20, 9), None);
    assert_eq!(o.complete(req.ticket, true, 20, 12), Err(LoadError::NotLoading));
    assert_eq!(o.phase(), LoadPhase::Exhausted);
    assert!(!o.has_more());
    assert!(!o.is_sentinel_attached());
    assert_eq!(o.next_deadline(), None);
    assert_eq!(o.on_sentinel_visible(10_000, 9), None);

    o.reset(20_000);
    assert_eq!(o.phase(), LoadPhase::Idle);
    assert!(o.on_sentinel_visible(20_000, 0).is_some());
}

#[test]
fn viewport_probe_margins() {
    let p = ViewportProbe {
        viewport_height: 800,
        sentinel_offset: 999,
        content_height: 1_199,
    };
    let far = ViewportProbe {
        sentinel_offset: 1_000,
        ..p
    };
    let filled = ViewportProbe {
        content_height: 1_200,
        ..p
    };
    assert!(p.sentinel_within(200));
    assert!(!far.sentinel_within(200));
    assert!(p.is_underfilled(150));
    assert!(!filled.is_underfilled(150));
}

#[test]
fn load_errors_render_messages() {
    let msg = std::format!("{}", LoadError::NotLoading);
    assert_eq!(msg, "no load request is in flight");
}
