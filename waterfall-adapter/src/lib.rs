//! Adapter utilities for the `waterfall` crate.
//!
//! The `waterfall` crate is UI-agnostic and only knows about keys, heights and time. This crate
//! provides the framework-neutral glue an adapter needs on top of it:
//!
//! - A [`Controller`] that owns the layout engine and load orchestrator and turns host events
//!   (attach, resize, item changes, sentinel visibility, timer ticks, frames) into engine calls
//! - Deferred-content tracking with a per-unit timeout ([`ContentTracker`])
//! - The [`LoadHandler`] seam towards the data source, plus a name-based [`CallbackRegistry`]
//!
//! This crate is intentionally framework-agnostic (no DOM or widget bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod content;
mod controller;
mod handler;
mod key;


pub use content::ContentTracker;
pub use controller::{Controller, ControllerOptions, Tick};
pub use handler::{CallbackRegistry, Dispatch, LoadHandler};
pub use key::WatchKey;
