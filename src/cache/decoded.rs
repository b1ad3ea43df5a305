//! Decoded per-channel amplitudes, cached on top of a [`RawSampleReader`].

use super::raw::RawSampleReader;
use super::window::{Flow, WindowCache, WindowSource};
use crate::core::params::CacheConfig;
use crate::core::types::{SampleIndex, WavFormat};
use crate::error::Result;
use crate::io::wav::SampleWidth;
use std::io::{Read, Seek};

/// Decodes frames pulled from the raw window.
pub struct DecodeSource<R: Read + Seek> {
    raw: RawSampleReader<R>,
    width: SampleWidth,
    channels: usize,
}

impl<R: Read + Seek> WindowSource for DecodeSource<R> {
    type Unit = i32;

    fn stride(&self) -> usize {
        self.channels
    }

    fn frame_count(&self) -> u64 {
        self.raw.frame_count()
    }

    fn fetch(&mut self, start: SampleIndex, end: SampleIndex, out: &mut Vec<i32>) -> Result<()> {
        let bytes = self.raw.read(start, end, 0)?;
        self.width.decode(bytes, out);
        Ok(())
    }
}

/// Interleaved `i32` amplitudes with a decoded window independent of the raw one.
pub struct DecodedSampleReader<R: Read + Seek> {
    format: WavFormat,
    cache: WindowCache<DecodeSource<R>>,
}

impl<R: Read + Seek> DecodedSampleReader<R> {
    /// Parses the WAV header of `reader` and builds both cache levels.
    pub fn open(reader: R, config: &CacheConfig) -> Result<Self> {
        let raw = RawSampleReader::open(reader, config)?;
        Self::new(raw, config)
    }

    /// Wraps `raw`; fails if its bit depth cannot be decoded.
    pub fn new(raw: RawSampleReader<R>, config: &CacheConfig) -> Result<Self> {
        let format = *raw.format();
        let width = SampleWidth::from_bits(format.bits_per_sample)?;
        let source = DecodeSource {
            raw,
            width,
            channels: format.channels as usize,
        };
        Ok(Self {
            format,
            cache: WindowCache::new(source, config.decoded_window_frames(format.channels)),
        })
    }

    pub fn format(&self) -> &WavFormat {
        &self.format
    }

    pub fn frame_count(&self) -> u64 {
        self.cache.frame_count()
    }

    pub fn channels(&self) -> usize {
        self.format.channels as usize
    }

    /// Values of frames `[start, end]`, prefetching forward.
    pub fn read(&mut self, start: SampleIndex, end: SampleIndex, prefetch: u64) -> Result<&[i32]> {
        self.cache.read(start, end, prefetch)
    }

    /// Values of frames `[start, end]`, prefetching backward.
    pub fn read_back(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
    ) -> Result<&[i32]> {
        self.cache.read_back(start, end, prefetch)
    }

    pub fn for_each_range<F>(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
        visit: F,
    ) -> Result<Option<SampleIndex>>
    where
        F: FnMut(SampleIndex, &[i32]) -> Result<Flow>,
    {
        self.cache.for_each_range(start, end, prefetch, visit)
    }

    pub fn for_each_range_reversed<F>(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
        visit: F,
    ) -> Result<Option<SampleIndex>>
    where
        F: FnMut(SampleIndex, &[i32]) -> Result<Flow>,
    {
        self.cache.for_each_range_reversed(start, end, prefetch, visit)
    }

    /// Underlying raw reader; its window is separate from the decoded one.
    pub fn raw(&self) -> &RawSampleReader<R> {
        &self.cache.source().raw
    }

    pub fn raw_mut(&mut self) -> &mut RawSampleReader<R> {
        &mut self.cache.source_mut().raw
    }

    /// Number of decode passes so far.
    pub fn fetch_count(&self) -> u64 {
        self.cache.fetch_count()
    }
}
