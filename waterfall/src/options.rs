use alloc::sync::Arc;

use crate::columns::column_count_for;

/// A callback fired whenever the published container height changes.
pub type HeightChangeCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Configuration for [`crate::Waterfall`].
///
/// Changing any of the layout-affecting fields through `Waterfall::set_options` while items
/// exist triggers a full relayout.
#[derive(Clone)]
pub struct LayoutOptions {
    /// Vertical space added below every item.
    pub row_gap: u32,
    /// Horizontal space between adjacent columns.
    pub column_gap: u32,
    /// Used to derive the column count from the container width.
    pub min_column_width: u32,
    /// Explicit column count. Disables the width-derived calculation when set.
    pub column_count: Option<usize>,

    /// Height reserved for an item whose content is unresolved and which has not rendered yet.
    pub fallback_estimate: u32,
    /// Height corrections of at most this many units are ignored.
    pub noise_threshold: u32,
    /// Width changes of at most this many units do not trigger a relayout.
    pub resize_threshold: u32,

    pub on_height_change: Option<HeightChangeCallback>,
}

impl LayoutOptions {
    pub fn new() -> Self {
        Self {
            row_gap: 10,
            column_gap: 10,
            min_column_width: 200,
            column_count: None,
            fallback_estimate: 200,
            noise_threshold: 1,
            resize_threshold: 1,
            on_height_change: None,
        }
    }

    pub fn with_row_gap(mut self, row_gap: u32) -> Self {
        self.row_gap = row_gap;
        self
    }

    pub fn with_column_gap(mut self, column_gap: u32) -> Self {
        self.column_gap = column_gap;
        self
    }

    pub fn with_gaps(mut self, row_gap: u32, column_gap: u32) -> Self {
        self.row_gap = row_gap;
        self.column_gap = column_gap;
        self
    }

    pub fn with_min_column_width(mut self, min_column_width: u32) -> Self {
        self.min_column_width = min_column_width;
        self
    }

    pub fn with_column_count(mut self, column_count: Option<usize>) -> Self {
        self.column_count = column_count;
        self
    }

    pub fn with_fallback_estimate(mut self, fallback_estimate: u32) -> Self {
        self.fallback_estimate = fallback_estimate;
        self
    }

    pub fn with_noise_threshold(mut self, noise_threshold: u32) -> Self {
        self.noise_threshold = noise_threshold;
        self
    }

    pub fn with_resize_threshold(mut self, resize_threshold: u32) -> Self {
        self.resize_threshold = resize_threshold;
        self
    }

    pub fn with_on_height_change(
        mut self,
        on_height_change: impl Fn(u64) + Send + Sync + 'static,
    ) -> Self {
        self.on_height_change = Some(Arc::new(on_height_change));
        self
    }

    /// Drops a previously set height-change callback.
    pub fn without_on_height_change(mut self) -> Self {
        self.on_height_change = None;
        self
    }

    /// Resolves the column count for a container width (never less than 1).
    pub fn resolve_column_count(&self, container_width: u32) -> usize {
        match self.column_count {
            Some(n) => n.max(1),
            None => column_count_for(container_width, self.min_column_width, self.column_gap),
        }
    }

    /// Whether switching from `self` to `next` moves any item.
    pub(crate) fn layout_differs(&self, next: &Self) -> bool {
        self.row_gap != next.row_gap
            || self.column_gap != next.column_gap
            || self.min_column_width != next.min_column_width
            || self.column_count != next.column_count
            || self.fallback_estimate != next.fallback_estimate
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutOptions")
            .field("row_gap", &self.row_gap)
            .field("column_gap", &self.column_gap)
            .field("min_column_width", &self.min_column_width)
            .field("column_count", &self.column_count)
            .field("fallback_estimate", &self.fallback_estimate)
            .field("noise_threshold", &self.noise_threshold)
            .field("resize_threshold", &self.resize_threshold)
            .finish_non_exhaustive()
    }
}

/// Timing and threshold configuration for [`crate::LoadOrchestrator`].
///
/// All durations are milliseconds of the host-supplied clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadOptions {
    /// Minimum time between a completed request and the next one.
    pub debounce_ms: u64,
    /// How far past the viewport's trailing edge the sentinel counts as visible.
    pub trigger_margin: u32,
    /// Content shorter than this share of the viewport (in percent) is topped up eagerly.
    pub fill_ratio_percent: u32,
    /// Delay after a completion before re-checking the sentinel.
    pub settle_delay_ms: u64,
    /// Delay after initialization/reset before the one-shot visibility check.
    pub initial_check_delay_ms: u64,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self {
            debounce_ms: 500,
            trigger_margin: 200,
            fill_ratio_percent: 150,
            settle_delay_ms: 100,
            initial_check_delay_ms: 100,
        }
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_trigger_margin(mut self, trigger_margin: u32) -> Self {
        self.trigger_margin = trigger_margin;
        self
    }

    pub fn with_fill_ratio_percent(mut self, fill_ratio_percent: u32) -> Self {
        self.fill_ratio_percent = fill_ratio_percent;
        self
    }

    pub fn with_settle_delay_ms(mut self, settle_delay_ms: u64) -> Self {
        self.settle_delay_ms = settle_delay_ms;
        self
    }

    pub fn with_initial_check_delay_ms(mut self, initial_check_delay_ms: u64) -> Self {
        self.initial_check_delay_ms = initial_check_delay_ms;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}
