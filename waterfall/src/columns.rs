use alloc::vec;
use alloc::vec::Vec;

/// Accumulated height per column.
///
/// Always holds at least one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnTracker {
    heights: Vec<u64>,
}

impl ColumnTracker {
    pub fn new(count: usize) -> Self {
        Self {
            heights: vec![0; count.max(1)],
        }
    }

    /// Resets every column to zero and resizes to `count` (floored to 1).
    pub fn reset(&mut self, count: usize) {
        self.heights.clear();
        self.heights.resize(count.max(1), 0);
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn heights(&self) -> &[u64] {
        &self.heights
    }

    pub fn height(&self, column: usize) -> Option<u64> {
        self.heights.get(column).copied()
    }

    /// Index of the shortest column. Ties resolve to the lowest index.
    pub fn shortest(&self) -> usize {
        let mut index = 0;
        let mut best = self.heights.first().copied().unwrap_or(0);
        for (i, &h) in self.heights.iter().enumerate().skip(1) {
            if h < best {
                best = h;
                index = i;
            }
        }
        index
    }

    pub fn grow(&mut self, column: usize, amount: u64) {
        if let Some(h) = self.heights.get_mut(column) {
            *h = h.saturating_add(amount);
        }
    }

    pub fn apply_delta(&mut self, column: usize, delta: i64) {
        if let Some(h) = self.heights.get_mut(column) {
            *h = shift(*h, delta);
        }
    }

    pub fn max_height(&self) -> u64 {
        self.heights.iter().copied().max().unwrap_or(0)
    }
}

impl Default for ColumnTracker {
    fn default() -> Self {
        Self::new(1)
    }
}

pub(crate) fn shift(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// Number of columns that fit `width` when each must be at least `min_column_width` wide.
///
/// Gaps sit between columns only, so `n` columns need `n * min + (n - 1) * gap` units.
pub fn column_count_for(width: u32, min_column_width: u32, column_gap: u32) -> usize {
    let unit = min_column_width as u64 + column_gap as u64;
    if unit == 0 {
        return 1;
    }
    let fit = (width as u64 + column_gap as u64) / unit;
    (fit as usize).max(1)
}

/// Integer column widths for a container.
///
/// The available width (container minus gaps) is divided evenly and the remainder is handed
/// out one unit at a time to the leftmost columns, so widths plus gaps add up to `container_width`
/// exactly whenever the container is at least as wide as the gaps.
///
/// A container narrower than its gaps (possible with an explicit column count) gets zero-width
/// columns, and the gaps alone then overflow `container_width`. The count is never reduced to
/// make the gaps fit, since placement depends on it.
pub fn column_widths(container_width: u32, count: usize, column_gap: u32) -> Vec<u32> {
    let count = count.max(1);
    let total_gap = (column_gap as u64).saturating_mul(count as u64 - 1);
    let available = (container_width as u64).saturating_sub(total_gap);
    let base = available / count as u64;
    let remainder = available % count as u64;
    (0..count as u64)
        .map(|i| (base + u64::from(i < remainder)) as u32)
        .collect()
}

/// Column widths plus the left offset of every column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnGeometry {
    widths: Vec<u32>,
    lefts: Vec<u32>,
}

impl ColumnGeometry {
    pub fn new(container_width: u32, count: usize, column_gap: u32) -> Self {
        let widths = column_widths(container_width, count, column_gap);
        let mut lefts = Vec::with_capacity(widths.len());
        let mut left = 0u32;
        for &w in &widths {
            lefts.push(left);
            left = left.saturating_add(w).saturating_add(column_gap);
        }
        Self { widths, lefts }
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    pub fn width(&self, column: usize) -> u32 {
        self.widths.get(column).copied().unwrap_or(0)
    }

    pub fn left(&self, column: usize) -> u32 {
        self.lefts.get(column).copied().unwrap_or(0)
    }
}
