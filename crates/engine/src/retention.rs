use std::collections::VecDeque;

/// A bounded, insertion-ordered history.
///
/// Appending past `capacity` evicts from the front, so the buffer always holds
/// the last `capacity` items in arrival order.
#[derive(Debug, Clone)]
pub struct RetentionBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RetentionBuffer<T> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuilds a buffer from a saved snapshot, keeping only its newest items.
    pub fn from_snapshot(capacity: usize, snapshot: Vec<T>) -> Self {
        let mut buffer = Self::new(capacity);
        let skip = snapshot.len().saturating_sub(buffer.capacity);
        buffer.items.extend(snapshot.into_iter().skip(skip));
        buffer
    }

    /// Appends `item`, returning the evicted oldest item if the bound was hit.
    pub fn append(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
