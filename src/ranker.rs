//! Fixed-capacity ranked collection.
//!
//! Every statistics engine funnels its candidate rows through a
//! `BoundedRanker`: items are offered one at a time, the comparator-best
//! `capacity` items are retained, and the final ordered view supports an
//! offset so pagination is a pure slice of one total order.

use std::cmp::Ordering;

/// Comparator: `Less` means the left item ranks first (is "better").
///
/// Comparators supplied by the sort-order enums always encode a
/// deterministic tie-break so equal primary keys still produce a
/// reproducible order.
pub type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A collection retaining only the comparator-best items seen so far.
pub struct BoundedRanker<T> {
    items: Vec<T>,
    capacity: usize,
    comparator: Comparator<T>,
}

impl<T> BoundedRanker<T> {
    /// Create a ranker with the given capacity and comparator.
    pub fn new(
        capacity: usize,
        comparator: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        BoundedRanker {
            items: Vec::new(),
            capacity,
            comparator: Box::new(comparator),
        }
    }

    /// Offer an item.
    ///
    /// If the ranker is full and the item ranks worse than the current
    /// worst, the ranker is left unchanged; otherwise the item is inserted
    /// in rank order and the worst item is evicted.
    pub fn offer(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        let insert_at = self
            .items
            .partition_point(|existing| (self.comparator)(existing, &item) != Ordering::Greater);
        if insert_at >= self.capacity {
            return;
        }
        self.items.insert(insert_at, item);
        self.items.truncate(self.capacity);
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the ranker holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents without offset trimming, in no guaranteed order.
    ///
    /// Used when several partial rankers are merged before one final trim.
    pub fn into_unordered_list(self) -> Vec<T> {
        self.items
    }

    /// Items ranked `[offset, capacity)`, best first, consuming the
    /// ranker.
    pub fn into_ordered_list(mut self, offset: usize) -> Vec<T> {
        if offset >= self.items.len() {
            return Vec::new();
        }
        self.items.drain(..offset);
        self.items
    }
}

impl<T> std::fmt::Debug for BoundedRanker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedRanker")
            .field("len", &self.items.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
