use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::columns::{ColumnGeometry, ColumnTracker, shift};
use crate::key::{KeyMap, LayoutKey};
use crate::scheduler::FrameScheduler;
use crate::{
    FlushReport, HeightState, IngestOutcome, LayoutOptions, LayoutSnapshot, Measure, Placement,
    Rect,
};

/// A height correction waiting for the next batch flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingAdjustment {
    pub column: usize,
    /// The item's top when the adjustment was queued. Flushes apply corrections in this order.
    pub committed_top: u64,
    /// The height reserved in the column for the item.
    pub estimated_height: u32,
}

/// A headless masonry layout engine.
///
/// Items are identified by a stable key `K`; the engine never touches item content, it only
/// keeps positional metadata (column, rectangle, provisional/final height) per key.
///
/// The host drives it:
/// - [`Waterfall::set_container_width`] when the container is measured or resized
/// - [`Waterfall::ingest`] (or [`Waterfall::place`]) when items are appended
/// - [`Waterfall::on_content_resolved`] when an item's deferred content finished loading
/// - [`Waterfall::flush`] once per rendering frame while a flush is scheduled
///
/// Every operation that needs a rendered height takes a `measure` closure so the engine always
/// sees the host's current numbers.
#[derive(Clone, Debug)]
pub struct Waterfall<K = u64> {
    options: LayoutOptions,
    container_width: u32,
    columns: ColumnTracker,
    geometry: ColumnGeometry,

    order: Vec<K>, // append order, including items not placed yet
    slots: KeyMap<K, Placement>,
    pending: KeyMap<K, PendingAdjustment>,
    scheduler: FrameScheduler,

    published_height: u64,
    laid_out: bool,
}

impl<K: LayoutKey> Waterfall<K> {
    pub fn new(options: LayoutOptions) -> Self {
        let count = options.resolve_column_count(0);
        wdebug!(column_count = count, "Waterfall::new");
        Self {
            container_width: 0,
            columns: ColumnTracker::new(count),
            geometry: ColumnGeometry::default(),
            order: Vec::new(),
            slots: KeyMap::new(),
            pending: KeyMap::new(),
            scheduler: FrameScheduler::new(),
            published_height: 0,
            laid_out: false,
            options,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Replaces the options. Returns `true` if a relayout ran.
    pub fn set_options(
        &mut self,
        options: LayoutOptions,
        measure: impl FnMut(&K) -> Measure,
    ) -> bool {
        let changed = self.options.layout_differs(&options);
        self.options = options;
        if !changed {
            return false;
        }
        if self.order.is_empty() {
            self.refresh_columns();
            return false;
        }
        self.relayout(measure)
    }

    /// Clones the current options, applies `f`, then delegates to `set_options`.
    pub fn update_options(
        &mut self,
        f: impl FnOnce(&mut LayoutOptions),
        measure: impl FnMut(&K) -> Measure,
    ) -> bool {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next, measure)
    }

    pub fn container_width(&self) -> u32 {
        self.container_width
    }

    /// Records a new container width. Returns `true` if a relayout ran.
    ///
    /// A zero width suspends layout; items ingested meanwhile are laid out once a width is known.
    /// Otherwise a relayout runs when the column count changes or the width moved by more than
    /// `resize_threshold`.
    pub fn set_container_width(
        &mut self,
        width: u32,
        measure: impl FnMut(&K) -> Measure,
    ) -> bool {
        let prev = self.container_width;
        if prev == width {
            return false;
        }
        self.container_width = width;
        if width == 0 {
            wdebug!(prev, "container width unavailable, layout suspended");
            self.laid_out = false;
            return false;
        }
        if !self.laid_out {
            return self.relayout(measure);
        }
        let next_count = self.options.resolve_column_count(width);
        if next_count != self.columns.len()
            || prev.abs_diff(width) > self.options.resize_threshold
        {
            return self.relayout(measure);
        }
        false
    }

    /// Feeds the host's current item list.
    ///
    /// The first non-empty list triggers a full layout (or is deferred until the container has a
    /// width). After that, only keys that were never placed are appended, in list order.
    pub fn ingest(
        &mut self,
        keys: &[K],
        mut measure: impl FnMut(&K) -> Measure,
    ) -> IngestOutcome {
        if !self.laid_out {
            if keys.is_empty() {
                return IngestOutcome::Unchanged;
            }
            self.order.clear();
            self.order.extend_from_slice(keys);
            if self.container_width == 0 {
                wdebug!(items = keys.len(), "ingest deferred until width is known");
                return IngestOutcome::Deferred;
            }
            self.relayout(measure);
            return IngestOutcome::Initial {
                placed: self.slots.len(),
            };
        }

        let mut placed = 0usize;
        for key in keys {
            if self.slots.contains_key(key) {
                continue;
            }
            self.order.push(key.clone());
            let m = measure(key);
            self.place_slot(key.clone(), m);
            placed += 1;
        }
        if placed == 0 {
            return IngestOutcome::Unchanged;
        }
        self.publish_height();
        IngestOutcome::Incremental { placed }
    }

    /// Appends a single item.
    ///
    /// Returns `None` while the container width is unknown; the item is remembered and placed by
    /// the next relayout. Placing an already placed key returns its current placement.
    pub fn place(&mut self, key: K, measure: Measure) -> Option<Placement> {
        if let Some(existing) = self.slots.get(&key) {
            return Some(*existing);
        }
        if self.container_width == 0 {
            if !self.order.contains(&key) {
                self.order.push(key);
            }
            return None;
        }
        self.order.push(key.clone());
        let placement = self.place_slot(key, measure);
        self.laid_out = true;
        self.publish_height();
        Some(placement)
    }

    /// Queues a height correction for an item whose deferred content has resolved.
    ///
    /// Never re-lays anything out synchronously. Returns `true` when this call scheduled a new
    /// flush frame (the host should request one), `false` if the request folded into an already
    /// scheduled frame or the item is unknown.
    pub fn on_content_resolved(&mut self, key: &K) -> bool {
        if !self.laid_out {
            return false;
        }
        let Some(slot) = self.slots.get(key) else {
            wwarn!("on_content_resolved: item is not placed");
            return false;
        };
        let adjustment = PendingAdjustment {
            column: slot.column,
            committed_top: slot.rect.top,
            estimated_height: slot.rect.height,
        };
        self.pending.insert(key.clone(), adjustment);
        self.scheduler.request()
    }

    /// Applies all pending height corrections. Does nothing unless a flush is scheduled.
    ///
    /// Corrections are grouped per column and applied in committed-top order; each correction
    /// beyond `noise_threshold` grows/shrinks its column and shifts every later item in that
    /// column, so successive corrections compose.
    pub fn flush(&mut self, mut measure: impl FnMut(&K) -> Measure) -> FlushReport {
        if !self.scheduler.begin() {
            return FlushReport::default();
        }

        let drained = core::mem::take(&mut self.pending);
        let processed = drained.len();
        let mut groups: BTreeMap<usize, Vec<(K, PendingAdjustment)>> = BTreeMap::new();
        for (key, adj) in drained {
            groups.entry(adj.column).or_default().push((key, adj));
        }

        let threshold = self.options.noise_threshold as u64;
        let mut adjusted = 0usize;
        for (column, mut entries) in groups {
            entries.sort_by_key(|(_, adj)| adj.committed_top);
            for (key, adj) in entries {
                let Some(slot) = self.slots.get_mut(&key) else {
                    continue;
                };
                if slot.column != column {
                    wwarn!(column, actual = slot.column, "flush: stale adjustment skipped");
                    continue;
                }
                slot.state = HeightState::Final;
                let measured = measure(&key).height;
                let delta = measured as i64 - adj.estimated_height as i64;
                if delta.unsigned_abs() <= threshold {
                    continue;
                }
                slot.rect.height = measured;
                let changed_top = slot.rect.top;
                self.columns.apply_delta(column, delta);
                self.shift_below(column, changed_top, delta);
                adjusted += 1;
            }
        }

        let container_height = if processed > 0 {
            self.publish_height();
            Some(self.published_height)
        } else {
            None
        };
        let reschedule = !self.pending.is_empty() && self.scheduler.request();
        wtrace!(processed, adjusted, reschedule, "flush");
        FlushReport {
            processed,
            adjusted,
            container_height,
            reschedule,
        }
    }

    /// Recomputes the column count, zeroes the columns and re-places every known item in
    /// original order. Pending corrections are discarded; fresh measurements replace them.
    ///
    /// Returns `false` (and places nothing) when the width is unknown or there are no items.
    pub fn relayout(&mut self, mut measure: impl FnMut(&K) -> Measure) -> bool {
        if self.container_width == 0 {
            wdebug!("relayout skipped: container width unavailable");
            return false;
        }
        self.refresh_columns();
        self.pending.clear();
        self.scheduler.cancel();
        self.slots.clear();
        if self.order.is_empty() {
            self.laid_out = false;
            self.publish_height();
            return false;
        }

        let order = core::mem::take(&mut self.order);
        for key in &order {
            let m = measure(key);
            self.place_slot(key.clone(), m);
        }
        self.order = order;
        self.laid_out = true;
        self.publish_height();
        wdebug!(
            items = self.order.len(),
            columns = self.columns.len(),
            width = self.container_width,
            "relayout"
        );
        true
    }

    /// Detaches an item and re-lays out the rest. Returns `false` for unknown keys.
    pub fn remove(&mut self, key: &K, measure: impl FnMut(&K) -> Measure) -> bool {
        let before = self.order.len();
        self.order.retain(|k| k != key);
        if self.order.len() == before {
            return false;
        }
        self.slots.remove(key);
        self.pending.remove(key);
        self.relayout(measure);
        true
    }

    /// Forgets every item and zeroes the columns.
    pub fn clear(&mut self) {
        self.order.clear();
        self.slots.clear();
        self.cancel_pending();
        let count = self.options.resolve_column_count(self.container_width);
        self.columns.reset(count);
        self.laid_out = false;
        self.publish_height();
        wdebug!(columns = count, "clear");
    }

    /// Drops queued corrections and the scheduled flush without applying them.
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
        self.scheduler.cancel();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether the current items have been laid out at the current width.
    pub fn is_laid_out(&self) -> bool {
        self.laid_out
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_widths(&self) -> &[u32] {
        self.geometry.widths()
    }

    pub fn column_heights(&self) -> &[u64] {
        self.columns.heights()
    }

    /// The last published container height (the tallest column).
    pub fn container_height(&self) -> u64 {
        self.published_height
    }

    pub fn item(&self, key: &K) -> Option<Placement> {
        self.slots.get(key).copied()
    }

    pub fn item_rect(&self, key: &K) -> Option<Rect> {
        self.item(key).map(|p| p.rect)
    }

    /// Iterates placed items in append order.
    pub fn for_each_item(&self, mut f: impl FnMut(&K, Placement)) {
        for key in &self.order {
            if let Some(p) = self.slots.get(key) {
                f(key, *p);
            }
        }
    }

    /// Collects placed items into `out` (clears `out` first).
    pub fn collect_items(&self, out: &mut Vec<(K, Placement)>) {
        out.clear();
        self.for_each_item(|k, p| out.push((k.clone(), p)));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_adjustment(&self, key: &K) -> Option<PendingAdjustment> {
        self.pending.get(key).copied()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            container_width: self.container_width,
            container_height: self.published_height,
            column_heights: self.columns.heights().to_vec(),
        }
    }

    fn refresh_columns(&mut self) {
        let count = self.options.resolve_column_count(self.container_width);
        self.columns.reset(count);
        self.geometry = ColumnGeometry::new(self.container_width, count, self.options.column_gap);
    }

    fn place_slot(&mut self, key: K, measure: Measure) -> Placement {
        let column = self.columns.shortest();
        let top = self.columns.height(column).unwrap_or(0);
        let (height, state) = if measure.resolved {
            (measure.height, HeightState::Final)
        } else if measure.height > 0 {
            (measure.height, HeightState::Provisional)
        } else {
            (self.options.fallback_estimate, HeightState::Provisional)
        };

        // Resolved items that rendered nothing take no space.
        if state == HeightState::Provisional || height > 0 {
            self.columns
                .grow(column, height as u64 + self.options.row_gap as u64);
        }

        let placement = Placement {
            column,
            rect: Rect {
                left: self.geometry.left(column),
                top,
                width: self.geometry.width(column),
                height,
            },
            state,
        };
        wtrace!(
            column,
            top,
            height,
            provisional = placement.is_provisional(),
            "place"
        );
        self.slots.insert(key, placement);
        placement
    }

    fn shift_below(&mut self, column: usize, changed_top: u64, delta: i64) {
        for slot in self.slots.values_mut() {
            if slot.column == column && slot.rect.top > changed_top {
                slot.rect.top = shift(slot.rect.top, delta);
            }
        }
    }

    fn publish_height(&mut self) {
        let height = self.columns.max_height();
        if height == self.published_height {
            return;
        }
        self.published_height = height;
        if let Some(cb) = &self.options.on_height_change {
            cb(height);
        }
    }
}
