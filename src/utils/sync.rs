//! Cache primitives for lazily-settled schema facts.
//!
//! Every fact cached by the reflectors is a pure function of immutable
//! metadata, so any number of racing writers compute the same value.
//! The primitives here exploit that: first writer wins, losers discard
//! their result, and the read path never takes a lock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::OnceLock;

/// Outcome of a settled [`LazySlot`]: either the computation produced a
/// value, or it determined that no value exists for this field.
///
/// `Absent` is a terminal answer, not a miss; a slot holding it will
/// never be recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<T> {
    Absent,
    Value(T),
}

impl<T> Presence<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Absent => None,
            Presence::Value(v) => Some(v),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Presence::Absent => None,
            Presence::Value(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Presence<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            None => Presence::Absent,
            Some(v) => Presence::Value(v),
        }
    }
}

/// A write-once slot with three states: unset, settled-absent, and
/// settled-to-a-value.
///
/// Writers race through [`LazySlot::set_if_unset`]; the first store wins
/// and every later reader observes it (release/acquire through the
/// underlying `OnceLock`). Losing a race is harmless because all racers
/// compute the same deterministic answer.
#[derive(Debug)]
pub struct LazySlot<T> {
    cell: OnceLock<Presence<T>>,
}

impl<T> Default for LazySlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazySlot<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// True once any answer (including `Absent`) has been stored.
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Option<&Presence<T>> {
        self.cell.get()
    }

    /// The stored value, if the slot settled to one.
    pub fn value(&self) -> Option<&T> {
        self.cell.get().and_then(Presence::value)
    }

    /// True if the slot settled with no value.
    pub fn is_absent(&self) -> bool {
        matches!(self.cell.get(), Some(Presence::Absent))
    }

    /// Store an answer unless one is already present, and return whichever
    /// answer won.
    pub fn set_if_unset(&self, answer: Presence<T>) -> &Presence<T> {
        // a lost race just discards our (identical) answer
        let _ = self.cell.set(answer);
        self.cell.get().unwrap()
    }

    pub fn set_value_if_unset(&self, value: T) -> &Presence<T> {
        self.set_if_unset(Presence::Value(value))
    }

    pub fn set_absent_if_unset(&self) -> &Presence<T> {
        self.set_if_unset(Presence::Absent)
    }

    /// Read the slot, computing the answer first if nobody has.
    pub fn get_or_init(&self, compute: impl FnOnce() -> Presence<T>) -> &Presence<T> {
        self.cell.get_or_init(compute)
    }
}

/// Packed cache of up to 16 lazily-computed booleans.
///
/// The low 16 bits hold values, the high 16 bits record which values have
/// been computed. Updates go through a compare-exchange retry loop and
/// are append-only: a settled bit can never be cleared or flipped, so a
/// losing racer simply observes the winner's (identical) answer.
#[derive(Debug, Default)]
pub struct FlagCache {
    bits: AtomicU32,
}

const VALID_SHIFT: u32 = 16;

impl FlagCache {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// `Some(value)` if the flag has been computed, `None` otherwise.
    pub fn get(&self, mask: u16) -> Option<bool> {
        let bits = self.bits.load(Ordering::Acquire);
        if bits & ((mask as u32) << VALID_SHIFT) != 0 {
            Some(bits & mask as u32 != 0)
        } else {
            None
        }
    }

    /// Record a computed flag and return the settled value. The first
    /// writer wins; later calls return the existing answer unchanged.
    pub fn set(&self, mask: u16, value: bool) -> bool {
        let valid = (mask as u32) << VALID_SHIFT;
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            if current & valid != 0 {
                return current & mask as u32 != 0;
            }
            let mut next = current | valid;
            if value {
                next |= mask as u32;
            }
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return value,
                Err(observed) => current = observed,
            }
        }
    }

    /// Read-through helper: return the cached flag or compute and settle it.
    pub fn get_or_compute(&self, mask: u16, compute: impl FnOnce() -> bool) -> bool {
        match self.get(mask) {
            Some(v) => v,
            None => self.set(mask, compute()),
        }
    }
}

/// A name-keyed cache shared across threads.
///
/// Failed lookups are stored as negative entries so repeated misses stay
/// cheap. The internal lock covers map operations only; callers must
/// never hold results across a metadata scan. Once the owner has
/// enumerated everything the cache can describe, it marks the cache
/// complete: a one-way transition that purges the negative entries,
/// after which further negative inserts are ignored.
pub struct ThreadSafeDictionary<K, V> {
    map: Mutex<HashMap<K, Option<V>>>,
    complete: AtomicBool,
}

impl<K: Eq + Hash, V: Clone> ThreadSafeDictionary<K, V> {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            complete: AtomicBool::new(false),
        }
    }

    /// Outer `None`: never looked up. Inner `None`: looked up and missed.
    pub fn try_get(&self, key: &K) -> Option<Option<V>> {
        self.map.lock().get(key).cloned()
    }

    /// Insert unless the key is already present, and return the entry
    /// that won.
    pub fn try_add(&self, key: K, value: Option<V>) -> Option<V> {
        let mut map = self.map.lock();
        if value.is_none() && self.complete.load(Ordering::Acquire) {
            // after completion the miss set is closed
            return map.get(&key).cloned().flatten();
        }
        map.entry(key).or_insert(value).clone()
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// One-way transition: the owner has enumerated every resolvable
    /// entry, so negative entries carry no information and are dropped.
    pub fn mark_complete(&self) {
        let mut map = self.map.lock();
        if !self.complete.swap(true, Ordering::AcqRel) {
            map.retain(|_, v| v.is_some());
        }
    }

    /// Drop the negative entries. Used when newly registered candidates
    /// may turn past misses into hits.
    pub fn purge_negatives(&self) {
        self.map.lock().retain(|_, v| v.is_some());
    }

    /// Snapshot of the positive entries.
    pub fn values(&self) -> Vec<V> {
        self.map.lock().values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for ThreadSafeDictionary<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn lazy_slot_distinguishes_absent_from_unset() {
        let slot: LazySlot<u32> = LazySlot::new();
        assert!(!slot.is_set());
        assert!(!slot.is_absent());

        slot.set_absent_if_unset();
        assert!(slot.is_set());
        assert!(slot.is_absent());
        assert_eq!(slot.value(), None);
    }

    #[test]
    fn lazy_slot_first_writer_wins() {
        let slot: LazySlot<u32> = LazySlot::new();
        assert_eq!(slot.set_value_if_unset(1), &Presence::Value(1));
        assert_eq!(slot.set_value_if_unset(2), &Presence::Value(1));
        assert_eq!(slot.value(), Some(&1));
    }

    #[test]
    fn lazy_slot_races_settle_once() {
        let slot: Arc<LazySlot<usize>> = Arc::new(LazySlot::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                std::thread::spawn(move || match slot.set_value_if_unset(42) {
                    Presence::Value(v) => *v,
                    Presence::Absent => unreachable!(),
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 42);
        }
    }

    #[test]
    fn flag_cache_tristate() {
        const A: u16 = 1 << 0;
        const B: u16 = 1 << 1;
        let flags = FlagCache::new();
        assert_eq!(flags.get(A), None);
        assert!(!flags.set(A, false));
        assert_eq!(flags.get(A), Some(false));
        assert_eq!(flags.get(B), None);
        assert!(flags.set(B, true));
        assert_eq!(flags.get(B), Some(true));
    }

    #[test]
    fn flag_cache_is_append_only() {
        const A: u16 = 1 << 3;
        let flags = FlagCache::new();
        assert!(flags.set(A, true));
        // a second writer cannot flip a settled bit
        assert!(flags.set(A, false));
        assert_eq!(flags.get(A), Some(true));
    }

    #[test]
    fn dictionary_purges_negatives_on_complete() {
        let dict: ThreadSafeDictionary<String, u32> = ThreadSafeDictionary::new();
        dict.try_add("hit".into(), Some(1));
        dict.try_add("miss".into(), None);
        assert_eq!(dict.try_get(&"miss".into()), Some(None));
        assert_eq!(dict.len(), 2);

        dict.mark_complete();
        assert_eq!(dict.try_get(&"miss".into()), None);
        assert_eq!(dict.len(), 1);

        // negative inserts are ignored after completion
        dict.try_add("other".into(), None);
        assert_eq!(dict.try_get(&"other".into()), None);
    }

    #[test]
    fn dictionary_first_insert_wins() {
        let dict: ThreadSafeDictionary<String, u32> = ThreadSafeDictionary::new();
        assert_eq!(dict.try_add("k".into(), Some(1)), Some(1));
        assert_eq!(dict.try_add("k".into(), Some(2)), Some(1));
    }
}
