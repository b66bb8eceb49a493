#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

/// Key bound for the adapter's own per-item maps.
///
/// Mirrors `waterfall::LayoutKey`, but follows this crate's `std` feature rather than
/// `waterfall/std`.
#[cfg(feature = "std")]
pub trait WatchKey: core::hash::Hash + Eq + Clone {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone> WatchKey for K {}

#[cfg(not(feature = "std"))]
pub trait WatchKey: Ord + Clone {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone> WatchKey for K {}
