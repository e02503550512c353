//! Shared utilities: the lock-free cache primitives the reflectors are
//! built on.

pub mod sync;

pub use sync::{FlagCache, LazySlot, Presence, ThreadSafeDictionary};
