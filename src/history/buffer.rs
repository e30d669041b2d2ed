use std::collections::VecDeque;

/// Fixed-capacity sequence kept in insertion order.
///
/// Pushing past capacity evicts the single oldest element, so the front is
/// always the earliest surviving insert.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> BoundedHistory<T> {
    /// Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            capacity,
            items: VecDeque::with_capacity(capacity + 1),
        })
    }

    /// Appends `item`, returning the evicted oldest element if capacity was exceeded.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Up to `n` elements, most recent first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        self.items.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_refused() {
        assert!(BoundedHistory::<u32>::new(0).is_none());
    }

    #[test]
    fn evicts_oldest_first() {
        let mut history = BoundedHistory::new(3).unwrap();
        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.push(3), None);
        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.push(5), Some(2));
        assert_eq!(history.len(), 3);
        assert_eq!(history.recent(10), vec![5, 4, 3]);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        for k in 0..12 {
            let mut history = BoundedHistory::new(5).unwrap();
            for i in 0..k {
                history.push(i);
            }
            assert_eq!(history.recent(1000).len(), k.min(5));
        }
    }

    #[test]
    fn recent_is_reverse_insertion_order() {
        let mut history = BoundedHistory::new(5).unwrap();
        for i in 1..=4 {
            history.push(i);
        }
        assert_eq!(history.recent(2), vec![4, 3]);
        assert_eq!(history.recent(0), Vec::<i32>::new());
        assert_eq!(history.recent(2), history.recent(2));
        assert_eq!(history.len(), 4);
        assert_eq!(history.capacity(), 5);
    }
}
