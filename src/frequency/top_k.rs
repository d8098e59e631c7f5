//! Exact Top-K frequency selection
//!
//! Every distinct category gets an exact count, so the answer never
//! depends on arrival order beyond the first-seen tie-break. A bounded
//! min-heap of the current best candidates keeps `top_k` at
//! O(k log k) instead of a full sort of the count table.

use crate::error::AnalyticsError;
use crate::traits::{FrequencySketch, HeavyHitters, MergeError, Sketch};
use core::cmp::Reverse;
use core::hash::Hash;
use std::{collections::HashMap, vec::Vec};
use xxhash_rust::xxh3::Xxh3Builder;

/// Count record for one distinct category, indexed by first-seen ordinal
#[derive(Clone, Debug)]
struct Tally<T> {
    key: T,
    count: u64,
}

/// `a` ranks above `b`: higher count, or equal count and seen earlier
#[inline]
fn outranks<T>(tallies: &[Tally<T>], a: usize, b: usize) -> bool {
    let (ca, cb) = (tallies[a].count, tallies[b].count);
    ca > cb || (ca == cb && a < b)
}

/// Fixed-capacity binary min-heap of category ordinals
///
/// The weakest candidate sits at index 0. `slots[ordinal]` records where a
/// member currently lives so a count increase can sift it in place.
#[derive(Clone, Debug, Default)]
struct CandidateHeap {
    capacity: usize,
    entries: Vec<usize>,
    slots: Vec<Option<usize>>,
}

impl CandidateHeap {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            slots: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn slot(&self, ordinal: usize) -> Option<usize> {
        self.slots.get(ordinal).copied().flatten()
    }

    fn set_slot(&mut self, ordinal: usize, slot: Option<usize>) {
        if ordinal >= self.slots.len() {
            if slot.is_none() {
                return;
            }
            self.slots.resize(ordinal + 1, None);
        }
        self.slots[ordinal] = slot;
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.entries.swap(i, j);
        let (a, b) = (self.entries[i], self.entries[j]);
        self.set_slot(a, Some(i));
        self.set_slot(b, Some(j));
    }

    fn sift_up<T>(&mut self, mut pos: usize, tallies: &[Tally<T>]) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !outranks(tallies, self.entries[parent], self.entries[pos]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down<T>(&mut self, mut pos: usize, tallies: &[Tally<T>]) {
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut weakest = pos;

            if left < self.entries.len() && outranks(tallies, self.entries[weakest], self.entries[left]) {
                weakest = left;
            }
            if right < self.entries.len() && outranks(tallies, self.entries[weakest], self.entries[right]) {
                weakest = right;
            }
            if weakest == pos {
                break;
            }
            self.swap(pos, weakest);
            pos = weakest;
        }
    }

    /// Restore order after the count of `ordinal` changed
    ///
    /// Returns the evicted ordinal when a full heap admits a stronger
    /// newcomer.
    fn offer<T>(&mut self, ordinal: usize, tallies: &[Tally<T>]) -> Option<usize> {
        if let Some(pos) = self.slot(ordinal) {
            // Counts only grow, so a member can only move away from the root
            self.sift_down(pos, tallies);
            return None;
        }
        if self.capacity == 0 {
            return None;
        }
        if self.entries.len() < self.capacity {
            let pos = self.entries.len();
            self.entries.push(ordinal);
            self.set_slot(ordinal, Some(pos));
            self.sift_up(pos, tallies);
            return None;
        }

        let weakest = self.entries[0];
        if !outranks(tallies, ordinal, weakest) {
            return None;
        }
        self.set_slot(weakest, None);
        self.entries[0] = ordinal;
        self.set_slot(ordinal, Some(0));
        self.sift_down(0, tallies);
        Some(weakest)
    }

    fn pop_weakest<T>(&mut self, tallies: &[Tally<T>]) -> Option<usize> {
        let last = self.entries.len().checked_sub(1)?;
        self.swap(0, last);
        let weakest = self.entries.pop()?;
        self.set_slot(weakest, None);
        if !self.entries.is_empty() {
            self.sift_down(0, tallies);
        }
        Some(weakest)
    }

    /// Members strongest first, without disturbing this heap
    fn ranked<T>(&self, tallies: &[Tally<T>]) -> Vec<usize> {
        let mut scratch = CandidateHeap {
            capacity: self.capacity,
            entries: self.entries.clone(),
            slots: Vec::new(),
        };
        let mut out = Vec::with_capacity(scratch.len());
        while let Some(ordinal) = scratch.pop_weakest(tallies) {
            out.push(ordinal);
        }
        out.reverse();
        out
    }
}

/// Exact Top-K counter with deterministic tie-breaking
///
/// Keeps an exact count per distinct category plus a heap of at most
/// `capacity` candidates. Results are ordered by count descending; equal
/// counts keep the order in which their categories were first seen.
///
/// # Example
///
/// ```
/// use tripstats::frequency::TopKSelector;
///
/// let mut topk = TopKSelector::new(2);
/// for zone in ["A", "B", "A", "C", "A", "B"] {
///     topk.insert(zone);
/// }
///
/// assert_eq!(topk.top_k(2), vec![("A", 3), ("B", 2)]);
/// ```
#[derive(Clone, Debug)]
pub struct TopKSelector<T: Hash + Eq + Clone + core::fmt::Debug> {
    /// Map from category to first-seen ordinal
    index: HashMap<T, usize, Xxh3Builder>,
    /// Counts by ordinal
    tallies: Vec<Tally<T>>,
    heap: CandidateHeap,
    total_count: u64,
    num_updates: u64,
}

impl<T: Hash + Eq + Clone + core::fmt::Debug> TopKSelector<T> {
    /// Create a selector whose candidate heap holds at most `capacity` entries
    ///
    /// `top_k(k)` for `k <= capacity` is served from the heap; larger `k`
    /// falls back to sorting the full count table.
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_hasher(Xxh3Builder::new()),
            tallies: Vec::new(),
            heap: CandidateHeap::new(capacity),
            total_count: 0,
            num_updates: 0,
        }
    }

    /// Heap capacity
    pub fn capacity(&self) -> usize {
        self.heap.capacity
    }

    /// Number of distinct categories seen
    pub fn distinct(&self) -> usize {
        self.tallies.len()
    }

    /// Total occurrences recorded
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Record one occurrence
    pub fn insert(&mut self, item: T) {
        self.insert_count(item, 1);
    }

    /// Record `count` occurrences at once
    ///
    /// A zero count still registers the category, fixing its first-seen
    /// position for tie-breaks.
    pub fn insert_count(&mut self, item: T, count: u64) {
        self.num_updates += 1;
        self.absorb(item, count);
    }

    fn absorb(&mut self, item: T, count: u64) {
        self.total_count = self.total_count.saturating_add(count);

        let ordinal = match self.index.get(&item) {
            Some(&ordinal) => ordinal,
            None => {
                let ordinal = self.tallies.len();
                self.tallies.push(Tally {
                    key: item.clone(),
                    count: 0,
                });
                self.index.insert(item, ordinal);
                ordinal
            }
        };

        let tally = &mut self.tallies[ordinal];
        tally.count = tally.count.saturating_add(count);
        if let Some(evicted) = self.heap.offer(ordinal, &self.tallies) {
            tracing::trace!(
                admitted = ordinal,
                evicted,
                count = self.tallies[ordinal].count,
                "top-k candidate replaced"
            );
        }
    }

    /// Exact count of a category, 0 if never seen
    pub fn estimate(&self, item: &T) -> u64 {
        self.index
            .get(item)
            .map(|&ordinal| self.tallies[ordinal].count)
            .unwrap_or(0)
    }

    /// Check if a category has been seen
    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    /// Check if a category is currently a heap candidate
    pub fn is_candidate(&self, item: &T) -> bool {
        self.index
            .get(item)
            .is_some_and(|&ordinal| self.heap.slot(ordinal).is_some())
    }

    /// Full count table in first-seen order
    pub fn counts(&self) -> impl Iterator<Item = (&T, u64)> + '_ {
        self.tallies.iter().map(|t| (&t.key, t.count))
    }

    /// Every ordinal, strongest first
    fn ranked_table(&self) -> Vec<usize> {
        let mut ordinals: Vec<usize> = (0..self.tallies.len()).collect();
        // Stable sort keeps first-seen order among equal counts
        ordinals.sort_by_key(|&o| Reverse(self.tallies[o].count));
        ordinals
    }

    fn materialize(&self, ordinals: impl IntoIterator<Item = usize>) -> Vec<(T, u64)> {
        ordinals
            .into_iter()
            .map(|o| (self.tallies[o].key.clone(), self.tallies[o].count))
            .collect()
    }

    /// Top-k with the heap invariants checked
    ///
    /// Fails with [`AnalyticsError::InvariantViolation`] if the candidate
    /// heap disagrees with the count table.
    pub fn try_top_k(&self, k: usize) -> Result<Vec<(T, u64)>, AnalyticsError> {
        if k == 0 || self.tallies.is_empty() {
            return Ok(Vec::new());
        }

        let covers_all = self.heap.len() == self.tallies.len();
        if k > self.heap.capacity && !covers_all {
            let mut ordinals = self.ranked_table();
            ordinals.truncate(k);
            return Ok(self.materialize(ordinals));
        }

        if self.heap.len() != self.heap.capacity.min(self.tallies.len()) {
            return Err(AnalyticsError::InvariantViolation(
                "candidate heap is not filled to capacity",
            ));
        }

        let mut ordinals = self.heap.ranked(&self.tallies);
        if ordinals.windows(2).any(|w| !outranks(&self.tallies, w[0], w[1])) {
            return Err(AnalyticsError::InvariantViolation(
                "candidate heap extraction is out of order",
            ));
        }
        ordinals.truncate(k);
        Ok(self.materialize(ordinals))
    }
}

impl<T: Hash + Eq + Clone + core::fmt::Debug> Sketch for TopKSelector<T> {
    type Item = T;

    fn update(&mut self, item: &T) -> Result<(), AnalyticsError> {
        self.insert(item.clone());
        Ok(())
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        // Categories new to `self` follow its own, in `other`'s first-seen order
        for tally in &other.tallies {
            self.absorb(tally.key.clone(), tally.count);
        }
        self.num_updates += other.num_updates;
        Ok(())
    }

    fn clear(&mut self) {
        let capacity = self.heap.capacity;
        self.index.clear();
        self.tallies.clear();
        self.heap = CandidateHeap::new(capacity);
        self.total_count = 0;
        self.num_updates = 0;
    }

    fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.tallies.capacity() * core::mem::size_of::<Tally<T>>()
            + self.index.capacity() * (core::mem::size_of::<T>() + core::mem::size_of::<usize>())
            + self.heap.entries.capacity() * core::mem::size_of::<usize>()
            + self.heap.slots.capacity() * core::mem::size_of::<Option<usize>>()
    }

    fn count(&self) -> u64 {
        self.num_updates
    }
}

impl<T: Hash + Eq + Clone + core::fmt::Debug> FrequencySketch for TopKSelector<T> {
    fn estimate_frequency(&self, item: &T) -> u64 {
        self.estimate(item)
    }
}

impl<T: Hash + Eq + Clone + core::fmt::Debug> HeavyHitters for TopKSelector<T> {
    /// A NaN threshold matches nothing; zero or negative matches everything
    fn heavy_hitters(&self, threshold: f64) -> Vec<(T, u64)> {
        let cutoff = threshold * self.total_count as f64;

        self.materialize(
            self.ranked_table()
                .into_iter()
                .take_while(|&o| self.tallies[o].count as f64 >= cutoff),
        )
    }

    fn top_k(&self, k: usize) -> Vec<(T, u64)> {
        match self.try_top_k(k) {
            Ok(top) => top,
            Err(err) => {
                // The count table is exact, so answer from it instead
                tracing::error!(%err, k, "top-k heap inconsistent, sorting full table");
                let mut ordinals = self.ranked_table();
                ordinals.truncate(k);
                self.materialize(ordinals)
            }
        }
    }
}

impl<T: Hash + Eq + Clone + core::fmt::Debug> TopKSelector<T> {
    /// The `k` most frequent categories, count descending
    ///
    /// Same as [`HeavyHitters::top_k`]; available without importing the trait.
    pub fn top_k(&self, k: usize) -> Vec<(T, u64)> {
        HeavyHitters::top_k(self, k)
    }
}

/// Count a sequence of categories and return its top `k`
///
/// ```
/// use tripstats::frequency::top_k_of;
///
/// let top = top_k_of([3, 1, 3, 2, 3, 1], 2).unwrap();
/// assert_eq!(top, vec![(3, 3), (1, 2)]);
/// ```
pub fn top_k_of<T, I>(items: I, k: usize) -> Result<Vec<(T, u64)>, AnalyticsError>
where
    T: Hash + Eq + Clone + core::fmt::Debug,
    I: IntoIterator<Item = T>,
{
    let mut selector = TopKSelector::new(k);
    for item in items {
        selector.insert(item);
    }
    let top = selector.try_top_k(k)?;
    tracing::debug!(
        k,
        distinct = selector.distinct(),
        total = selector.total_count(),
        returned = top.len(),
        "top-k selection finished"
    );
    Ok(top)
}

#[cfg(feature = "serde")]
impl<T: Hash + Eq + Clone + core::fmt::Debug + serde::Serialize> serde::Serialize
    for TopKSelector<T>
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let counts: Vec<_> = self.tallies.iter().map(|t| (&t.key, t.count)).collect();

        let mut state = serializer.serialize_struct("TopKSelector", 4)?;
        state.serialize_field("capacity", &self.heap.capacity)?;
        state.serialize_field("total_count", &self.total_count)?;
        state.serialize_field("num_updates", &self.num_updates)?;
        state.serialize_field("counts", &counts)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for TopKSelector<T>
where
    T: Hash + Eq + Clone + core::fmt::Debug + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(bound = "T: serde::Deserialize<'de>")]
        struct TopKData<T> {
            capacity: usize,
            #[serde(default)]
            num_updates: Option<u64>,
            counts: Vec<(T, u64)>,
        }

        let data = TopKData::<T>::deserialize(deserializer)?;
        let mut selector = TopKSelector::new(data.capacity);
        for (key, count) in data.counts {
            selector.insert_count(key, count);
        }
        if let Some(num_updates) = data.num_updates {
            selector.num_updates = num_updates;
        }
        Ok(selector)
    }
}
