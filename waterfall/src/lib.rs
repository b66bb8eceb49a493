//! A headless masonry ("waterfall") layout engine.
//!
//! For host-facing lifecycle, timers and load dispatch, see the `waterfall-adapter` crate.
//!
//! Items go to the currently shortest column (ties to the lowest index). Items whose content is
//! still loading get a provisional height; once the content resolves, corrections are batched
//! into one flush per rendering frame that shifts the later items of the same column.
//! [`LoadOrchestrator`] decides when to ask an external data source for more items.
//!
//! It is UI-agnostic. A host layer is expected to provide:
//! - the container width
//! - item identities and rendered heights (through `measure` closures)
//! - content-resolution, frame and sentinel-visibility signals, with a millisecond clock
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod columns;
mod error;
mod key;
mod layout;
mod loader;
mod options;
mod scheduler;
mod types;

#[cfg(test)]
mod tests;

pub use columns::{ColumnGeometry, ColumnTracker, column_count_for, column_widths};
pub use error::LoadError;
pub use key::LayoutKey;
pub use layout::{PendingAdjustment, Waterfall};
pub use loader::{
    Completion, LoadOrchestrator, LoadPhase, LoadRequest, LoadState, LoadTicket, ViewportProbe,
};
pub use options::{HeightChangeCallback, LayoutOptions, LoadOptions};
pub use scheduler::FrameScheduler;
pub use types::{
    FlushReport, HeightState, IngestOutcome, LayoutSnapshot, Measure, Placement, Rect,
};
