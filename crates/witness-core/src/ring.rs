//! Fixed-capacity FIFO buffer.
//!
//! Backs both the network log store and the session recorder. Pushing past
//! capacity evicts from the front, so every push is O(1) regardless of how
//! much history is retained.

use std::collections::VecDeque;

/// Upper bound on the storage reserved up front. Larger buffers grow on
/// demand.
const INITIAL_RESERVE: usize = 1024;

/// A fixed-capacity ring buffer that evicts its oldest element on overflow.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` elements (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(INITIAL_RESERVE)),
            capacity,
        }
    }

    /// Append an element, returning the evicted oldest element if full.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Change the capacity, dropping the oldest elements that no longer fit.
    ///
    /// Returns how many elements were dropped.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        let excess = self.items.len().saturating_sub(self.capacity);
        self.items.drain(..excess);
        excess
    }

    /// Maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Most recently pushed element.
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 1..=5 {
            ring.push(i);
        }
        assert_eq!(ring.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut ring = RingBuffer::new(1);
        assert_eq!(ring.push("a"), None);
        assert_eq!(ring.push("b"), Some("a"));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let ring: RingBuffer<u8> = RingBuffer::new(0);
        assert_eq!(ring.capacity(), 1);
    }

    #[test]
    fn test_shrink_drops_oldest() {
        let mut ring = RingBuffer::new(5);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.set_capacity(2), 3);
        assert_eq!(ring.to_vec(), vec![3, 4]);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut ring = RingBuffer::new(usize::MAX);
        assert_eq!(ring.capacity(), usize::MAX);
        for i in 0..2000 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 2000);
        assert_eq!(ring.last(), Some(&1999));
    }

    proptest! {
        #[test]
        fn prop_retains_most_recent_in_order(
            capacity in 1usize..64,
            items in proptest::collection::vec(any::<u32>(), 0..256),
        ) {
            let mut ring = RingBuffer::new(capacity);
            for item in &items {
                ring.push(*item);
            }

            let expected_len = items.len().min(capacity);
            prop_assert_eq!(ring.len(), expected_len);
            prop_assert_eq!(ring.to_vec(), items[items.len() - expected_len..].to_vec());
        }
    }
}
