//! Category counts with a capped number of tracked keys

use super::Bin;
use crate::error::MergeError;
use crate::traits::{Histogram, Sketch};
use core::fmt::Debug;
use core::hash::Hash;
use std::collections::HashMap;

/// Histogram over categorical values
///
/// Up to `capacity` distinct keys are counted exactly. Past that the
/// Space-Saving rule applies: a new key replaces the key with the smallest
/// weight (the earliest-tracked slot on ties) and starts from that weight
/// plus one. Bin weights therefore always sum to the number of observed
/// values, and the weight of every tracked key is an upper bound on its
/// true count, overcounting by at most `observed / capacity`.
///
/// # Example
///
/// ```
/// use flowprint::histogram::CategoricalHistogram;
/// use flowprint::traits::Histogram;
///
/// let mut hist = CategoricalHistogram::new(100);
/// for fruit in [Some("apple"), Some("pear"), None, Some("apple")] {
///     hist.insert(fruit);
/// }
///
/// assert_eq!(hist.weight(&"apple"), 2);
/// assert_eq!(hist.missing_count(), 1);
/// assert_eq!(hist.total_count(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct CategoricalHistogram<K: Ord + Hash + Clone + Debug> {
    /// Maximum number of keys tracked
    capacity: usize,
    /// Map from key to slot index
    index: HashMap<K, usize>,
    /// Tracked keys and their weights
    slots: Vec<(K, u64)>,
    /// Number of observed (non-missing) values
    count: u64,
    /// Number of missing values
    missing: u64,
    /// Number of keys that replaced another one
    evictions: u64,
}

impl<K: Ord + Hash + Clone + Debug> CategoricalHistogram<K> {
    /// Create a histogram tracking at most `capacity` keys
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");

        Self {
            capacity,
            index: HashMap::new(),
            slots: Vec::new(),
            count: 0,
            missing: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of keys currently tracked
    pub fn num_tracked(&self) -> usize {
        self.slots.len()
    }

    /// Whether any key had to be replaced to stay within capacity
    pub fn is_truncated(&self) -> bool {
        self.evictions > 0
    }

    /// Insert one value, `None` counting as missing
    pub fn insert(&mut self, value: Option<K>) {
        match value {
            Some(key) => self.add_count(key, 1),
            None => self.missing += 1,
        }
    }

    /// Add `weight` observations of `key`
    pub fn add_count(&mut self, key: K, weight: u64) {
        if weight == 0 {
            return;
        }
        self.count += weight;

        if let Some(&idx) = self.index.get(&key) {
            self.slots[idx].1 += weight;
            return;
        }

        if self.slots.len() < self.capacity {
            self.index.insert(key.clone(), self.slots.len());
            self.slots.push((key, weight));
            return;
        }

        let min_idx = self.min_index();
        let (old_key, min_weight) = &self.slots[min_idx];
        let min_weight = *min_weight;
        self.index.remove(old_key);
        self.index.insert(key.clone(), min_idx);
        self.slots[min_idx] = (key, min_weight + weight);
        self.evictions += 1;
    }

    fn min_index(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, (_, weight))| *weight)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Weight recorded for `key`, 0 if it is not tracked
    pub fn weight(&self, key: &K) -> u64 {
        self.index
            .get(key)
            .map(|&idx| self.slots[idx].1)
            .unwrap_or(0)
    }
}

impl<K: Ord + Hash + Clone + Debug> Sketch for CategoricalHistogram<K> {
    type Item = Option<K>;

    fn update(&mut self, item: &Option<K>) {
        self.insert(item.clone());
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if self.capacity != other.capacity {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("capacity={}", self.capacity),
                found: format!("capacity={}", other.capacity),
            });
        }

        for (key, weight) in &other.slots {
            self.add_count(key.clone(), *weight);
        }
        self.missing += other.missing;
        self.evictions += other.evictions;
        Ok(())
    }

    fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.count = 0;
        self.missing = 0;
        self.evictions = 0;
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.slots.capacity() * core::mem::size_of::<(K, u64)>()
            + self.index.capacity() * core::mem::size_of::<(K, usize)>()
    }

    /// Every inserted value, missing ones included
    fn count(&self) -> u64 {
        self.count + self.missing
    }
}

impl<K: Ord + Hash + Clone + Debug> Histogram for CategoricalHistogram<K> {
    type Key = K;

    fn bins(&self) -> Vec<Bin<K>> {
        let mut bins: Vec<Bin<K>> = self
            .slots
            .iter()
            .map(|(key, weight)| Bin::new(key.clone(), *weight))
            .collect();
        bins.sort_by(|a, b| a.key.cmp(&b.key));
        bins
    }

    fn missing_count(&self) -> u64 {
        self.missing
    }

    fn observed_count(&self) -> u64 {
        self.count
    }
}
