use alloc::vec::Vec;

/// An item rectangle inside the container.
///
/// `left`/`width` are on the cross axis (container width), `top`/`height` on the growing axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub left: u32,
    pub top: u64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn bottom(&self) -> u64 {
        self.top.saturating_add(self.height as u64)
    }
}

/// Whether the height committed for an item is still an estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeightState {
    /// Content (e.g. images) was still loading at placement time.
    Provisional,
    #[default]
    Final,
}

/// What the host reports about an item when the engine asks for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measure {
    /// The currently rendered height (may be `0` if nothing has rendered yet).
    pub height: u32,
    /// `true` once all deferred content of the item has loaded (or failed).
    pub resolved: bool,
}

impl Measure {
    pub fn resolved(height: u32) -> Self {
        Self {
            height,
            resolved: true,
        }
    }

    pub fn pending(height: u32) -> Self {
        Self {
            height,
            resolved: false,
        }
    }
}

/// Positional metadata the engine keeps for a placed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    pub column: usize,
    /// `rect.height` is the height reserved in the column, not necessarily the rendered one.
    pub rect: Rect,
    pub state: HeightState,
}

impl Placement {
    pub fn is_provisional(&self) -> bool {
        self.state == HeightState::Provisional
    }
}

/// Result of feeding the current item list to [`crate::Waterfall::ingest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IngestOutcome {
    /// Items are known but the container has no width yet; layout waits for it.
    Deferred,
    /// The first batch was laid out from scratch.
    Initial { placed: usize },
    /// Only the newly observed items were appended.
    Incremental { placed: usize },
    Unchanged,
}

/// Summary of one batch flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlushReport {
    /// Pending adjustments drained by this flush.
    pub processed: usize,
    /// Adjustments whose delta exceeded the noise threshold.
    pub adjusted: usize,
    /// The republished container height, when anything was processed.
    pub container_height: Option<u64>,
    /// Whether another flush was scheduled because adjustments are still pending.
    pub reschedule: bool,
}

/// A diagnostic snapshot of the column state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutSnapshot {
    pub container_width: u32,
    pub container_height: u64,
    pub column_heights: Vec<u64>,
}

impl LayoutSnapshot {
    pub fn column_count(&self) -> usize {
        self.column_heights.len()
    }
}
