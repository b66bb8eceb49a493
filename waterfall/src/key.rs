#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

/// Stable item identity used to key per-item layout metadata.
///
/// With `std` this is any `Hash + Eq + Clone` type; without it, `Ord + Clone`.
#[cfg(feature = "std")]
pub trait LayoutKey: core::hash::Hash + Eq + Clone {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone> LayoutKey for K {}

#[cfg(not(feature = "std"))]
pub trait LayoutKey: Ord + Clone {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone> LayoutKey for K {}
