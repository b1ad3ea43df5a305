//! Fixed-capacity ring buffer with overwrite-on-full semantics.

/// Fixed-capacity ring buffer.
///
/// The buffer never allocates after construction. Pushing into a full buffer
/// evicts the oldest element.
#[derive(Debug, Clone)]
pub struct RingBuffer<T>
where
    T: Copy + Default,
{
    data: Vec<T>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T>
where
    T: Copy + Default,
{
    /// Creates a ring buffer with fixed capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: vec![T::default(); cap],
            head: 0,
            len: 0,
        }
    }

    /// Returns the number of elements currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns true when no elements are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when the next push evicts.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Pushes one element, returning the evicted oldest one when full.
    ///
    /// A zero-capacity buffer hands `value` straight back.
    pub fn push_evict(&mut self, value: T) -> Option<T> {
        let cap = self.capacity();
        if cap == 0 {
            return Some(value);
        }
        if self.len == cap {
            let evicted = self.data[self.head];
            self.data[self.head] = value;
            self.head = (self.head + 1) % cap;
            Some(evicted)
        } else {
            self.data[(self.head + self.len) % cap] = value;
            self.len += 1;
            None
        }
    }

    /// Oldest stored element.
    #[inline]
    pub fn oldest(&self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            Some(self.data[self.head])
        }
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let cap = self.capacity();
        (0..self.len).map(move |i| self.data[(self.head + i) % cap])
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn push_evict_wrap() {
        let mut rb = RingBuffer::<i32>::with_capacity(3);
        assert_eq!(rb.push_evict(1), None);
        assert_eq!(rb.push_evict(2), None);
        assert_eq!(rb.push_evict(3), None);
        assert!(rb.is_full());
        assert_eq!(rb.push_evict(4), Some(1));
        assert_eq!(rb.oldest(), Some(2));
        assert_eq!(rb.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity() {
        let mut rb = RingBuffer::<u8>::with_capacity(0);
        assert_eq!(rb.push_evict(9), Some(9));
        assert!(rb.is_empty());
        assert_eq!(rb.oldest(), None);
    }
}
