//! RIFF/WAVE header parsing and writing, and PCM sample codecs.

use crate::core::types::WavFormat;
use crate::error::{Result, WskError};
use std::io::{Read, Seek, SeekFrom, Write};

/// WAV audio format codes.
const WAV_FORMAT_PCM: u16 = 1;
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Size of the canonical header produced by [`write_header`].
pub const HEADER_LEN: u64 = 44;

/// Parsed header of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: WavFormat,
    /// Byte offset of the first sample in the stream.
    pub data_start: u64,
    /// Number of complete frames in the data chunk.
    pub frame_count: u64,
}

impl WavHeader {
    /// Length of the data chunk in bytes.
    pub fn data_len(&self) -> u64 {
        self.frame_count * self.format.block_align() as u64
    }
}

/// Reads the RIFF header, `fmt ` and `data` chunk locations from `reader`.
///
/// Leaves the reader positioned at an unspecified offset.
pub fn read_header<R: Read + Seek>(reader: &mut R) -> Result<WavHeader> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut riff = [0u8; 12];
    read_exact_or(reader, &mut riff, "WAV file too short")?;
    if &riff[0..4] != b"RIFF" {
        return Err(WskError::InvalidFormat("Missing RIFF header".to_string()));
    }
    if &riff[8..12] != b"WAVE" {
        return Err(WskError::InvalidFormat(
            "Missing WAVE identifier".to_string(),
        ));
    }

    let mut cursor: u64 = 12;
    let mut format: Option<WavFormat> = None;
    let mut data: Option<(u64, u64)> = None;

    while cursor + 8 <= stream_len && (format.is_none() || data.is_none()) {
        let mut chunk = [0u8; 8];
        reader.seek(SeekFrom::Start(cursor))?;
        read_exact_or(reader, &mut chunk, "truncated chunk header")?;
        let chunk_size = read_u32_le(&chunk, 4) as u64;
        cursor += 8;

        match &chunk[0..4] {
            b"fmt " => {
                if chunk_size < 16 {
                    return Err(WskError::InvalidFormat(format!(
                        "fmt chunk too short: {} bytes",
                        chunk_size
                    )));
                }
                let mut body = [0u8; 16];
                read_exact_or(reader, &mut body, "fmt chunk too short")?;
                format = Some(parse_fmt(&body)?);
            }
            b"data" => {
                let available = stream_len.saturating_sub(cursor);
                let size = if chunk_size > available {
                    log::warn!(
                        "data chunk declares {} bytes but only {} remain; truncating",
                        chunk_size,
                        available
                    );
                    available
                } else {
                    chunk_size
                };
                data = Some((cursor, size));
            }
            other => {
                log::debug!(
                    "skipping chunk '{}' ({} bytes)",
                    String::from_utf8_lossy(other),
                    chunk_size
                );
            }
        }

        cursor += chunk_size;
        // WAV chunks are word-aligned
        if chunk_size % 2 == 1 {
            cursor += 1;
        }
    }

    let format =
        format.ok_or_else(|| WskError::InvalidFormat("No fmt chunk found".to_string()))?;
    let (data_start, data_len) =
        data.ok_or_else(|| WskError::InvalidFormat("No data chunk found".to_string()))?;

    let block_align = format.block_align() as u64;
    if data_len % block_align != 0 {
        return Err(WskError::InvalidFormat(format!(
            "data chunk of {} bytes is not a multiple of the {}-byte frame",
            data_len, block_align
        )));
    }

    Ok(WavHeader {
        format,
        data_start,
        frame_count: data_len / block_align,
    })
}

fn parse_fmt(body: &[u8; 16]) -> Result<WavFormat> {
    let format_tag = read_u16_le(body, 0);
    let channels = read_u16_le(body, 2);
    let sample_rate = read_u32_le(body, 4);
    let byte_rate = read_u32_le(body, 8);
    let block_align = read_u16_le(body, 12);
    let bits_per_sample = read_u16_le(body, 14);

    if format_tag != WAV_FORMAT_PCM && format_tag != WAV_FORMAT_EXTENSIBLE {
        return Err(WskError::InvalidFormat(format!(
            "Unsupported WAV format code {}",
            format_tag
        )));
    }
    if channels == 0 || sample_rate == 0 {
        return Err(WskError::InvalidFormat(format!(
            "Invalid fmt chunk: {} channels at {} Hz",
            channels, sample_rate
        )));
    }
    SampleWidth::from_bits(bits_per_sample)?;

    let format = WavFormat {
        format_tag,
        channels,
        sample_rate,
        bits_per_sample,
    };
    if block_align as usize != format.block_align() {
        return Err(WskError::InvalidFormat(format!(
            "BlockAlign is {}, expected {}",
            block_align,
            format.block_align()
        )));
    }
    if byte_rate != format.byte_rate() {
        return Err(WskError::InvalidFormat(format!(
            "ByteRate is {}, expected {}",
            byte_rate,
            format.byte_rate()
        )));
    }
    Ok(format)
}

/// Writes a canonical 44-byte PCM header for `frame_count` frames.
pub fn write_header<W: Write>(writer: &mut W, format: &WavFormat, frame_count: u64) -> Result<()> {
    let data_size = frame_count * format.block_align() as u64;
    if data_size + 36 > u32::MAX as u64 {
        return Err(WskError::InvalidArgument(format!(
            "{} frames do not fit in a RIFF container",
            frame_count
        )));
    }
    let data_size = data_size as u32;

    let mut out = Vec::with_capacity(HEADER_LEN as usize);
    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(data_size + 36).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    out.extend_from_slice(&WAV_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.byte_rate().to_le_bytes());
    out.extend_from_slice(&(format.block_align() as u16).to_le_bytes());
    out.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    writer.write_all(&out)?;
    Ok(())
}

/// Encodes interleaved `samples` as a complete in-memory WAV file.
pub fn write_wav(format: &WavFormat, samples: &[i32]) -> Result<Vec<u8>> {
    let width = SampleWidth::from_bits(format.bits_per_sample)?;
    let channels = format.channels.max(1) as usize;
    let frames = (samples.len() / channels) as u64;
    let mut out = Vec::with_capacity(HEADER_LEN as usize + samples.len() * width.bytes());
    write_header(&mut out, format, frames)?;
    width.encode(&samples[..frames as usize * channels], &mut out);
    Ok(out)
}

/// Width of one PCM channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    /// Unsigned 8-bit, centred on 128.
    U8,
    I16,
    I24,
    I32,
}

impl SampleWidth {
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(SampleWidth::U8),
            16 => Ok(SampleWidth::I16),
            24 => Ok(SampleWidth::I24),
            32 => Ok(SampleWidth::I32),
            other => Err(WskError::UnsupportedBitDepth(other)),
        }
    }

    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::U8 => 1,
            SampleWidth::I16 => 2,
            SampleWidth::I24 => 3,
            SampleWidth::I32 => 4,
        }
    }

    /// Largest magnitude a value of this width can hold, `2^(bits-1)`.
    #[inline]
    pub fn full_scale(self) -> u64 {
        1u64 << (self.bytes() * 8 - 1)
    }

    /// Decodes every complete value in `bytes`, appending to `out`.
    pub fn decode(self, bytes: &[u8], out: &mut Vec<i32>) {
        out.reserve(bytes.len() / self.bytes());
        match self {
            SampleWidth::U8 => out.extend(bytes.iter().map(|&b| b as i32 - 128)),
            SampleWidth::I16 => out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32),
            ),
            SampleWidth::I24 => out.extend(bytes.chunks_exact(3).map(|b| {
                // Sign extend through the high byte
                (b[0] as i32) | ((b[1] as i32) << 8) | ((b[2] as i8 as i32) << 16)
            })),
            SampleWidth::I32 => out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ),
        }
    }

    /// Encodes `values`, clamping each to the representable range.
    pub fn encode(self, values: &[i32], out: &mut Vec<u8>) {
        out.reserve(values.len() * self.bytes());
        for &v in values {
            match self {
                SampleWidth::U8 => out.push((v.clamp(-128, 127) + 128) as u8),
                SampleWidth::I16 => out.extend_from_slice(
                    &(v.clamp(i16::MIN as i32, i16::MAX as i32) as i16).to_le_bytes(),
                ),
                SampleWidth::I24 => {
                    let c = v.clamp(-(1 << 23), (1 << 23) - 1);
                    out.extend_from_slice(&c.to_le_bytes()[..3]);
                }
                SampleWidth::I32 => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
    }
}

fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => WskError::InvalidFormat(what.to_string()),
        _ => WskError::from(e),
    })
}

#[inline]
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
