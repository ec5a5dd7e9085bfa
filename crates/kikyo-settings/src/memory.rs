use crate::profile::ThumbSide;
use std::collections::HashMap;
use std::hash::Hash;

/// Remembers a boolean whose control is currently disabled by another field.
///
/// Thumb-key repeat is only meaningful while single-press mode lets the key
/// emit itself. When the mode changes to one that suppresses repeat, the
/// document must carry `false`, but the user's choice has to come back once
/// the mode allows repeat again. The store holds that choice; an unset key
/// means the user never touched the control and nothing was seeded.
#[derive(Debug, Clone)]
pub struct DerivedFieldMemory<K = ThumbSide> {
    values: HashMap<K, bool>,
}

impl<K> Default for DerivedFieldMemory<K> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> DerivedFieldMemory<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: K) -> Option<bool> {
        self.values.get(&key).copied()
    }

    pub fn set(&mut self, key: K, value: bool) {
        self.values.insert(key, value);
    }

    /// Initializes `key` from a loaded document unless it is already known.
    ///
    /// Returns whether the value was taken.
    pub fn seed(&mut self, key: K, raw: bool) -> bool {
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, raw);
        true
    }

    /// Effective value for `key` given whether its control is in effect.
    ///
    /// While `guard` holds, `live` is remembered and returned. Otherwise the
    /// neutral `false` is returned and the remembered value is left alone.
    pub fn reconcile(&mut self, key: K, guard: bool, live: bool) -> bool {
        if guard {
            self.values.insert(key, live);
            live
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
