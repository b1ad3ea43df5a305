//! Single-window read cache over an indexed source.
//!
//! A [`WindowCache`] holds exactly one contiguous [`CacheWindow`] of frames.
//! Requests fully inside the window are served from memory; any other request
//! discards the window and loads a new one with a single source fetch.

use crate::core::types::SampleIndex;
use crate::error::{Result, WskError};

/// Backing store a [`WindowCache`] reads from.
pub trait WindowSource {
    /// Element type of the buffered data (bytes, decoded values, ...).
    type Unit: Copy;

    /// Units per frame.
    fn stride(&self) -> usize;

    /// Total frames available.
    fn frame_count(&self) -> u64;

    /// Appends the units of frames `[start, end]` to `out`.
    fn fetch(&mut self, start: SampleIndex, end: SampleIndex, out: &mut Vec<Self::Unit>)
        -> Result<()>;
}

/// Visitor verdict for ranged iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep walking.
    Continue,
    /// Stop the walk, reporting this frame index to the caller.
    StopAt(SampleIndex),
}

/// A buffered contiguous frame range.
#[derive(Debug, Clone)]
pub struct CacheWindow<U> {
    pub start: SampleIndex,
    pub end: SampleIndex,
    buffer: Vec<U>,
}

impl<U> CacheWindow<U> {
    /// True when `[start, end]` lies inside this window.
    #[inline]
    pub fn covers(&self, start: SampleIndex, end: SampleIndex) -> bool {
        start >= self.start && end <= self.end
    }

    /// Number of frames held.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Buffered units.
    pub fn buffer(&self) -> &[U] {
        &self.buffer
    }
}

/// Read cache holding one window of at most `window_frames` frames (unless a
/// single request is wider).
#[derive(Debug)]
pub struct WindowCache<S: WindowSource> {
    source: S,
    window_frames: u64,
    window: Option<CacheWindow<S::Unit>>,
    fetches: u64,
}

impl<S: WindowSource> WindowCache<S> {
    pub fn new(source: S, window_frames: u64) -> Self {
        Self {
            source,
            window_frames: window_frames.max(1),
            window: None,
            fetches: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Total frames of the underlying source.
    pub fn frame_count(&self) -> u64 {
        self.source.frame_count()
    }

    /// Configured maximum window length in frames.
    pub fn window_frames(&self) -> u64 {
        self.window_frames
    }

    /// Current window, if any has been loaded.
    pub fn window(&self) -> Option<&CacheWindow<S::Unit>> {
        self.window.as_ref()
    }

    /// Number of source fetches performed so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Returns the units of frames `[start, end]`.
    ///
    /// On a miss, loads `[start, start + prefetch - 1]` clipped to the window
    /// size and the source, but never less than the request.
    pub fn read(&mut self, start: SampleIndex, end: SampleIndex, prefetch: u64) -> Result<&[S::Unit]> {
        self.check_range(start, end)?;
        if !self.is_cached(start, end) {
            let last = self.frame_count() - 1;
            let upper = (start + prefetch.min(self.window_frames))
                .saturating_sub(1)
                .min(last);
            self.load(start, upper.max(end))?;
        }
        Ok(self.slice(start, end))
    }

    /// Like [`read`](Self::read), but a miss extends the window backward from `end`.
    pub fn read_back(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
    ) -> Result<&[S::Unit]> {
        self.check_range(start, end)?;
        if !self.is_cached(start, end) {
            let lower = (end + 1).saturating_sub(prefetch.min(self.window_frames));
            self.load(lower.min(start), end)?;
        }
        Ok(self.slice(start, end))
    }

    /// Walks `[start, end]` in increasing chunks of at most the window size.
    ///
    /// The visitor receives each chunk's first frame index and its units.
    /// Returns the index of the first `Flow::StopAt`, if any.
    pub fn for_each_range<F>(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
        mut visit: F,
    ) -> Result<Option<SampleIndex>>
    where
        F: FnMut(SampleIndex, &[S::Unit]) -> Result<Flow>,
    {
        self.check_range(start, end)?;
        let mut cur = start;
        loop {
            let mut chunk_end = end.min(cur.saturating_add(self.window_frames - 1));
            if let Some(w) = &self.window {
                if w.covers(cur, cur) {
                    chunk_end = chunk_end.min(w.end);
                }
            }
            let want = prefetch.max(chunk_end - cur + 1);
            let units = self.read(cur, chunk_end, want)?;
            if let Flow::StopAt(idx) = visit(cur, units)? {
                return Ok(Some(idx));
            }
            if chunk_end == end {
                return Ok(None);
            }
            cur = chunk_end + 1;
        }
    }

    /// Walks `[start, end]` in decreasing chunks of at most the window size.
    ///
    /// Each chunk is still handed over in ascending order together with its
    /// lowest frame index; visitors scan it from the back.
    pub fn for_each_range_reversed<F>(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
        mut visit: F,
    ) -> Result<Option<SampleIndex>>
    where
        F: FnMut(SampleIndex, &[S::Unit]) -> Result<Flow>,
    {
        self.check_range(start, end)?;
        let mut cur = end;
        loop {
            let mut chunk_start = start.max((cur + 1).saturating_sub(self.window_frames));
            if let Some(w) = &self.window {
                if w.covers(cur, cur) {
                    chunk_start = chunk_start.max(w.start);
                }
            }
            let want = prefetch.max(cur - chunk_start + 1);
            let units = self.read_back(chunk_start, cur, want)?;
            if let Flow::StopAt(idx) = visit(chunk_start, units)? {
                return Ok(Some(idx));
            }
            if chunk_start == start {
                return Ok(None);
            }
            cur = chunk_start - 1;
        }
    }

    fn is_cached(&self, start: SampleIndex, end: SampleIndex) -> bool {
        self.window.as_ref().is_some_and(|w| w.covers(start, end))
    }

    fn check_range(&self, start: SampleIndex, end: SampleIndex) -> Result<()> {
        let total = self.frame_count();
        if start > end || end >= total {
            return Err(WskError::InvalidArgument(format!(
                "frame range [{}, {}] outside stream of {} frames",
                start, end, total
            )));
        }
        Ok(())
    }

    fn load(&mut self, start: SampleIndex, end: SampleIndex) -> Result<()> {
        let mut buffer = self.window.take().map(|w| w.buffer).unwrap_or_default();
        buffer.clear();
        self.source.fetch(start, end, &mut buffer)?;
        self.fetches += 1;

        let expected = (end - start + 1) as usize * self.source.stride();
        if buffer.len() != expected {
            return Err(WskError::IoError(format!(
                "short read: frames [{}, {}] gave {} units, expected {}",
                start,
                end,
                buffer.len(),
                expected
            )));
        }
        log::debug!("cache window loaded: frames [{}, {}]", start, end);
        self.window = Some(CacheWindow { start, end, buffer });
        Ok(())
    }

    fn slice(&self, start: SampleIndex, end: SampleIndex) -> &[S::Unit] {
        match &self.window {
            Some(w) => {
                let stride = self.source.stride();
                let offset = (start - w.start) as usize * stride;
                let len = (end - start + 1) as usize * stride;
                &w.buffer[offset..offset + len]
            }
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory source counting its fetches.
    struct VecSource {
        data: Vec<u8>,
        stride: usize,
    }

    impl WindowSource for VecSource {
        type Unit = u8;

        fn stride(&self) -> usize {
            self.stride
        }

        fn frame_count(&self) -> u64 {
            (self.data.len() / self.stride) as u64
        }

        fn fetch(&mut self, start: u64, end: u64, out: &mut Vec<u8>) -> Result<()> {
            let a = start as usize * self.stride;
            let b = (end as usize + 1) * self.stride;
            out.extend_from_slice(&self.data[a..b]);
            Ok(())
        }
    }

    struct FailingSource;

    impl WindowSource for FailingSource {
        type Unit = u8;

        fn stride(&self) -> usize {
            1
        }

        fn frame_count(&self) -> u64 {
            100
        }

        fn fetch(&mut self, _: u64, _: u64, _: &mut Vec<u8>) -> Result<()> {
            Err(WskError::IoError("disk on fire".to_string()))
        }
    }

    fn source(frames: usize, stride: usize) -> VecSource {
        VecSource {
            data: (0..frames * stride).map(|i| (i * 7 % 251) as u8).collect(),
            stride,
        }
    }

    #[test]
    fn test_reads_match_source() {
        let src = source(1000, 3);
        let expected = src.data.clone();
        let mut cache = WindowCache::new(src, 64);
        let mut seed: u64 = 12345;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let a = (seed >> 33) % 1000;
            let len = (seed >> 13) % 80;
            let b = (a + len).min(999);
            let prefetch = (seed >> 7) % 200;
            let got = if seed % 2 == 0 {
                cache.read(a, b, prefetch).unwrap().to_vec()
            } else {
                cache.read_back(a, b, prefetch).unwrap().to_vec()
            };
            assert_eq!(got, &expected[a as usize * 3..(b as usize + 1) * 3]);
        }
    }

    #[test]
    fn test_cached_reread_does_no_io() {
        let mut cache = WindowCache::new(source(500, 2), 100);
        let first = cache.read(10, 20, 50).unwrap().to_vec();
        assert_eq!(cache.fetch_count(), 1);
        let second = cache.read(10, 20, 50).unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(cache.fetch_count(), 1);
        // Inside the prefetched span as well
        cache.read(40, 59, 0).unwrap();
        assert_eq!(cache.fetch_count(), 1);
        cache.read(40, 60, 0).unwrap();
        assert_eq!(cache.fetch_count(), 2);
    }

    #[test]
    fn test_prefetch_is_bounded() {
        let mut cache = WindowCache::new(source(500, 1), 100);
        cache.read(0, 9, 10_000).unwrap();
        let w = cache.window().unwrap();
        assert_eq!((w.start, w.end), (0, 99));

        cache.read(450, 460, 10_000).unwrap();
        let w = cache.window().unwrap();
        assert_eq!((w.start, w.end), (450, 499));

        cache.read_back(200, 210, 30).unwrap();
        let w = cache.window().unwrap();
        assert_eq!((w.start, w.end), (181, 210));
        assert_eq!(w.buffer().len(), 30);

        // A request wider than the window is still served whole
        let wide = cache.read(0, 299, 0).unwrap();
        assert_eq!(wide.len(), 300);
    }

    #[test]
    fn test_forward_walk_is_monotonic_and_gap_free() {
        let src = source(1000, 2);
        let expected = src.data.clone();
        let mut cache = WindowCache::new(src, 64);
        let mut starts = Vec::new();
        let mut collected = Vec::new();
        let stop = cache
            .for_each_range(5, 990, 0, |first, units| {
                starts.push((first, units.len() as u64 / 2));
                collected.extend_from_slice(units);
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(stop, None);
        let mut next = 5;
        for &(first, len) in &starts {
            assert_eq!(first, next);
            assert!(len > 0 && len <= 64);
            next = first + len;
        }
        assert_eq!(next, 991);
        assert_eq!(collected, &expected[10..991 * 2]);
    }

    #[test]
    fn test_reverse_walk_is_monotonic_and_gap_free() {
        let mut cache = WindowCache::new(source(300, 1), 50);
        let mut chunks = Vec::new();
        cache
            .for_each_range_reversed(7, 299, 0, |first, units| {
                chunks.push((first, units.len() as u64));
                Ok(Flow::Continue)
            })
            .unwrap();
        let mut expected_end = 299;
        for &(first, len) in &chunks {
            assert_eq!(first + len - 1, expected_end);
            expected_end = first.wrapping_sub(1);
        }
        assert_eq!(chunks.last().map(|c| c.0), Some(7));
    }

    #[test]
    fn test_walk_reuses_cached_window() {
        let mut cache = WindowCache::new(source(1000, 1), 100);
        cache.read(0, 9, 100).unwrap();
        let mut chunks = Vec::new();
        cache
            .for_each_range(50, 249, 0, |first, units| {
                chunks.push((first, units.len()));
                Ok(Flow::Continue)
            })
            .unwrap();
        assert_eq!(chunks, vec![(50, 50), (100, 100), (200, 50)]);
        assert_eq!(cache.fetch_count(), 3);
    }

    #[test]
    fn test_walk_stops_early() {
        let mut cache = WindowCache::new(source(1000, 1), 16);
        let mut visited = 0;
        let stop = cache
            .for_each_range(0, 999, 0, |first, _| {
                visited += 1;
                if first >= 32 {
                    Ok(Flow::StopAt(first + 3))
                } else {
                    Ok(Flow::Continue)
                }
            })
            .unwrap();
        assert_eq!(stop, Some(35));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut cache = WindowCache::new(source(10, 1), 4);
        assert!(cache.read(5, 10, 0).is_err());
        assert!(cache.read(6, 5, 0).is_err());
    }

    #[test]
    fn test_source_error_propagates() {
        let mut cache = WindowCache::new(FailingSource, 10);
        let err = cache.read(0, 5, 0).unwrap_err();
        assert_eq!(err, WskError::IoError("disk on fire".to_string()));
        assert!(cache.window().is_none());
    }
}
