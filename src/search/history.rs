use crate::core::ring_buffer::RingBuffer;
use crate::core::types::SampleIndex;

/// Distance of one probe window to the reference, with the probe's first frame in scan order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeDistance {
    pub distance: i64,
    pub anchor: SampleIndex,
}

/// The last few probe distances and their running sum.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    entries: RingBuffer<ProbeDistance>,
    sum: i64,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RingBuffer::with_capacity(capacity),
            sum: 0,
        }
    }

    pub fn push(&mut self, entry: ProbeDistance) {
        if let Some(evicted) = self.entries.push_evict(entry) {
            self.sum -= evicted.distance;
        }
        self.sum += entry.distance;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }

    /// Largest tracked distance.
    pub fn max(&self) -> Option<i64> {
        self.entries.iter().map(|e| e.distance).max()
    }

    pub fn oldest(&self) -> Option<ProbeDistance> {
        self.entries.oldest()
    }

    /// True when a full history sits under both limits and `current` is
    /// already further from the reference than the oldest entry.
    pub fn converged(&self, current: i64, sum_limit: i64, entry_limit: i64) -> bool {
        if !self.is_full() || self.sum >= sum_limit {
            return false;
        }
        match (self.max(), self.oldest()) {
            (Some(max), Some(oldest)) => max < entry_limit && oldest.distance < current,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(history: &mut SearchHistory, distances: &[i64]) {
        for (i, &d) in distances.iter().enumerate() {
            history.push(ProbeDistance {
                distance: d,
                anchor: i as u64 * 10,
            });
        }
    }

    #[test]
    fn test_running_sum_tracks_evictions() {
        let mut h = SearchHistory::new(3);
        push_all(&mut h, &[5, 7, 9, 11]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.sum(), 27);
        assert_eq!(h.max(), Some(11));
        assert_eq!(h.oldest().map(|e| e.anchor), Some(10));
    }

    #[test]
    fn test_needs_full_history() {
        let mut h = SearchHistory::new(5);
        push_all(&mut h, &[1, 1, 1, 1]);
        assert!(!h.converged(100, 1000, 1000));
        h.push(ProbeDistance::default());
        assert!(h.converged(100, 1000, 1000));
    }

    #[test]
    fn test_limits_and_trend() {
        let mut h = SearchHistory::new(5);
        push_all(&mut h, &[10, 9, 8, 7, 6]);
        // Still falling: oldest is not below the new distance
        assert!(!h.converged(5, 1000, 1000));
        assert!(h.converged(11, 1000, 1000));
        // Sum limit is exclusive
        assert!(!h.converged(11, 40, 1000));
        // Entry limit is exclusive
        assert!(!h.converged(11, 1000, 10));
    }
}
