//! Streaming output of encoded frames.

use crate::core::types::WavFormat;
use crate::error::{Result, WskError};
use crate::io::wav::{write_header, SampleWidth};
use std::io::Write;

/// Encoded bytes buffered before a flush.
pub const SINK_BUFFER_BYTES: usize = 2 * 1024 * 1024;

/// Destination of an action's output frames.
pub trait OutputSink {
    /// Appends interleaved channel values; a partial trailing frame is an error.
    fn push_frames(&mut self, values: &[i32]) -> Result<()>;

    /// Appends already-encoded frame bytes.
    fn push_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Appends `frames` frames of digital silence.
    fn push_silence(&mut self, frames: u64) -> Result<()>;

    /// Flushes everything and returns the number of frames written.
    fn finalize(&mut self) -> Result<u64>;
}

/// Writes a WAV stream incrementally: header first, then buffered frames.
pub struct WavSink<W: Write> {
    writer: W,
    format: WavFormat,
    width: SampleWidth,
    pending: Vec<u8>,
    frames_written: u64,
}

impl<W: Write> WavSink<W> {
    /// Writes the header for `declared_frames` frames and returns the sink.
    pub fn new(mut writer: W, format: &WavFormat, declared_frames: u64) -> Result<Self> {
        let width = SampleWidth::from_bits(format.bits_per_sample)?;
        write_header(&mut writer, format, declared_frames)?;
        Ok(Self {
            writer,
            format: *format,
            width,
            pending: Vec::with_capacity(SINK_BUFFER_BYTES),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn silent_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.format.block_align());
        self.width
            .encode(&vec![0; self.format.channels as usize], &mut frame);
        frame
    }

    fn flush_pending(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.writer.write_all(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.pending.len() >= SINK_BUFFER_BYTES {
            self.flush_pending()?;
        }
        Ok(())
    }
}

impl<W: Write> OutputSink for WavSink<W> {
    fn push_frames(&mut self, values: &[i32]) -> Result<()> {
        let channels = self.format.channels.max(1) as usize;
        if values.len() % channels != 0 {
            return Err(WskError::InvalidArgument(format!(
                "{} values do not make whole {}-channel frames",
                values.len(),
                channels
            )));
        }
        self.width.encode(values, &mut self.pending);
        self.frames_written += (values.len() / channels) as u64;
        self.flush_if_full()
    }

    fn push_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let block_align = self.format.block_align().max(1);
        if bytes.len() % block_align != 0 {
            return Err(WskError::InvalidArgument(format!(
                "{} bytes do not make whole {}-byte frames",
                bytes.len(),
                block_align
            )));
        }
        self.flush_pending()?;
        self.writer.write_all(bytes)?;
        self.frames_written += (bytes.len() / block_align) as u64;
        Ok(())
    }

    fn push_silence(&mut self, frames: u64) -> Result<()> {
        let block_align = self.format.block_align();
        let silent_frame = self.silent_frame();
        let mut remaining = frames;
        while remaining > 0 {
            let chunk = remaining.min((SINK_BUFFER_BYTES / block_align.max(1)).max(1) as u64);
            for _ in 0..chunk {
                self.pending.extend_from_slice(&silent_frame);
            }
            self.frames_written += chunk;
            remaining -= chunk;
            self.flush_if_full()?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<u64> {
        self.flush_pending()?;
        self.writer.flush()?;
        Ok(self.frames_written)
    }
}
