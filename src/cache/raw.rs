//! Undecoded frame access over a seekable WAV stream.

use super::window::{Flow, WindowCache, WindowSource};
use crate::core::params::CacheConfig;
use crate::core::types::{SampleIndex, WavFormat};
use crate::error::{Result, WskError};
use crate::io::wav::{read_header, WavHeader};
use std::io::{Read, Seek, SeekFrom};

/// Byte-level source over the data chunk of a WAV stream.
pub struct RawSource<R> {
    reader: R,
    data_start: u64,
    block_align: usize,
    frames: u64,
}

impl<R: Read + Seek> WindowSource for RawSource<R> {
    type Unit = u8;

    fn stride(&self) -> usize {
        self.block_align
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }

    fn fetch(&mut self, start: SampleIndex, end: SampleIndex, out: &mut Vec<u8>) -> Result<()> {
        let offset = self.data_start + start * self.block_align as u64;
        let len = (end - start + 1) as usize * self.block_align;
        self.reader.seek(SeekFrom::Start(offset))?;
        let from = out.len();
        out.resize(from + len, 0);
        self.reader
            .read_exact(&mut out[from..])
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => WskError::IoError(format!(
                    "short read at byte {}: wanted {} bytes",
                    offset, len
                )),
                _ => WskError::from(e),
            })
    }
}

/// Reads raw interleaved frame bytes through a single cached window.
pub struct RawSampleReader<R: Read + Seek> {
    header: WavHeader,
    cache: WindowCache<RawSource<R>>,
}

impl<R: Read + Seek> RawSampleReader<R> {
    /// Parses the WAV header of `reader` and wraps its data chunk.
    pub fn open(mut reader: R, config: &CacheConfig) -> Result<Self> {
        let header = read_header(&mut reader)?;
        Self::from_header(reader, header, config)
    }

    /// Wraps a stream whose header was already parsed.
    pub fn from_header(reader: R, header: WavHeader, config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let block_align = header.format.block_align();
        let source = RawSource {
            reader,
            data_start: header.data_start,
            block_align,
            frames: header.frame_count,
        };
        log::debug!(
            "raw reader: {} frames of {} bytes from offset {}",
            header.frame_count,
            block_align,
            header.data_start
        );
        Ok(Self {
            header,
            cache: WindowCache::new(source, config.raw_window_frames(block_align)),
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn format(&self) -> &WavFormat {
        &self.header.format
    }

    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    /// Bytes of frames `[start, end]`, prefetching forward.
    pub fn read(&mut self, start: SampleIndex, end: SampleIndex, prefetch: u64) -> Result<&[u8]> {
        self.cache.read(start, end, prefetch)
    }

    /// Bytes of frames `[start, end]`, prefetching backward.
    pub fn read_back(
        &mut self,
        start: SampleIndex,
        end: SampleIndex,
        prefetch: u64,
    ) -> Result<&[u8]> {
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
        F: FnMut(SampleIndex, &[u8]) -> Result<Flow>,
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
        F: FnMut(SampleIndex, &[u8]) -> Result<Flow>,
    {
        self.cache.for_each_range_reversed(start, end, prefetch, visit)
    }

    /// Number of stream reads issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.cache.fetch_count()
    }

    pub fn into_inner(self) -> R {
        self.cache.into_source().reader
    }
}
