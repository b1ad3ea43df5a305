use super::kernel::{CosSinSums, NumericKernel, ReferenceKernel};
use crate::core::types::WavFormat;
use crate::error::{Result, WskError};
use crate::io::wav::SampleWidth;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lowest semitone offset from A4 that is profiled.
pub const FIRST_SEMITONE: i32 = -59;
/// Highest semitone offset from A4 that is profiled.
pub const LAST_SEMITONE: i32 = 79;
/// Reference pitch of semitone 0.
pub const REFERENCE_HZ: f64 = 440.0;
/// Fixed-point scale of profile distances.
pub const DISTANCE_SCALE: i64 = 10_000_000_000_000;

/// Angular step per frame of every profiled bin, `-2π·440·2^(i/12) / sample_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    sample_rate: u32,
    omegas: Vec<f64>,
}

impl FrequencyTable {
    pub fn new(sample_rate: u32) -> Self {
        let omegas = (FIRST_SEMITONE..=LAST_SEMITONE)
            .map(|i| {
                -2.0 * PI * REFERENCE_HZ * 2f64.powf(i as f64 / 12.0) / sample_rate.max(1) as f64
            })
            .collect();
        Self {
            sample_rate,
            omegas,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of bins (139).
    pub fn len(&self) -> usize {
        self.omegas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.omegas.is_empty()
    }

    pub fn omegas(&self) -> &[f64] {
        &self.omegas
    }

    /// Centre frequency of bin `bin` in Hz.
    pub fn frequency(&self, bin: usize) -> f64 {
        REFERENCE_HZ * 2f64.powf((FIRST_SEMITONE + bin as i32) as f64 / 12.0)
    }
}

/// Precomputed `cos(ω·t)` and `sin(ω·t)` for `t` in `0..len`, bin-major.
#[derive(Debug, Clone)]
pub struct TrigCache {
    len: usize,
    cos: Vec<f64>,
    sin: Vec<f64>,
}

impl TrigCache {
    pub fn new(table: &FrequencyTable, len: usize) -> Self {
        let mut cos = Vec::with_capacity(table.len() * len);
        let mut sin = Vec::with_capacity(table.len() * len);
        for &omega in table.omegas() {
            for t in 0..len {
                let angle = omega * t as f64;
                cos.push(angle.cos());
                sin.push(angle.sin());
            }
        }
        Self { len, cos, sin }
    }

    /// Frames covered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, bin: usize, t: usize) -> (f64, f64) {
        let i = bin * self.len + t;
        (self.cos[i], self.sin[i])
    }
}

/// Squared magnitudes of one analysed window, `magnitudes[bin][channel]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectralProfile {
    pub bits_per_sample: u16,
    pub sample_count: u64,
    pub magnitudes: Vec<Vec<u128>>,
}

impl SpectralProfile {
    /// Number of channels profiled.
    pub fn channels(&self) -> usize {
        self.magnitudes.first().map_or(0, Vec::len)
    }

    /// Upper bound of any magnitude, `2·(n·2^(bits-1))²`; 0 for an empty window.
    pub fn bound(&self) -> f64 {
        let full_scale = 2f64.powi(self.bits_per_sample.max(1) as i32 - 1);
        let peak = self.sample_count as f64 * full_scale;
        2.0 * peak * peak
    }

    fn from_sums(bits_per_sample: u16, sample_count: u64, channels: usize, sums: &CosSinSums) -> Self {
        let channels = channels.max(1);
        let magnitudes = sums
            .chunks_exact(channels)
            .map(|row| {
                row.iter()
                    .map(|c| {
                        let re = c.re.unsigned_abs() as u128;
                        let im = c.im.unsigned_abs() as u128;
                        re * re + im * im
                    })
                    .collect()
            })
            .collect();
        Self {
            bits_per_sample,
            sample_count,
            magnitudes,
        }
    }
}

/// Running sums for a profile built from consecutive buffers.
#[derive(Debug, Clone)]
pub struct ProfileAccumulator {
    format: WavFormat,
    width: SampleWidth,
    frames: u64,
    sums: CosSinSums,
}

impl ProfileAccumulator {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Computes spectral profiles and their distances for one stream format.
pub struct SpectralProfiler<K: NumericKernel = ReferenceKernel> {
    kernel: K,
    table: FrequencyTable,
    trig_len: usize,
    trig: Option<TrigCache>,
}

impl SpectralProfiler<ReferenceKernel> {
    /// Profiler for `sample_rate` whose angle cache spans `probe_frames` frames.
    pub fn new(sample_rate: u32, probe_frames: u64) -> Self {
        Self::with_kernel(ReferenceKernel, sample_rate, probe_frames)
    }
}

impl<K: NumericKernel> SpectralProfiler<K> {
    pub fn with_kernel(kernel: K, sample_rate: u32, probe_frames: u64) -> Self {
        Self {
            kernel,
            table: FrequencyTable::new(sample_rate),
            trig_len: probe_frames as usize,
            trig: None,
        }
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    /// Profile of the `frames` frames of `buffer`.
    pub fn compute_profile(
        &mut self,
        buffer: &[u8],
        format: &WavFormat,
        frames: u64,
    ) -> Result<SpectralProfile> {
        let mut acc = self.begin(format)?;
        let expected = frames as usize * format.block_align();
        if buffer.len() < expected {
            return Err(WskError::InvalidArgument(format!(
                "profile buffer holds {} bytes, {} frames need {}",
                buffer.len(),
                frames,
                expected
            )));
        }
        self.accumulate(&mut acc, &buffer[..expected]);
        Ok(self.finish(&acc))
    }

    /// Starts a profile spanning several buffers.
    pub fn begin(&self, format: &WavFormat) -> Result<ProfileAccumulator> {
        let width = SampleWidth::from_bits(format.bits_per_sample)?;
        Ok(ProfileAccumulator {
            format: *format,
            width,
            frames: 0,
            sums: vec![Complex::new(0, 0); self.table.len() * format.channels.max(1) as usize],
        })
    }

    /// Adds the next consecutive frames to `acc`.
    pub fn accumulate(&mut self, acc: &mut ProfileAccumulator, buffer: &[u8]) {
        let block_align = acc.format.block_align().max(1);
        let frames = (buffer.len() / block_align) as u64;
        if frames == 0 {
            return;
        }
        if acc.frames < self.trig_len as u64 && self.trig.is_none() {
            log::debug!(
                "building trigonometric cache: {} bins x {} frames",
                self.table.len(),
                self.trig_len
            );
            self.trig = Some(TrigCache::new(&self.table, self.trig_len));
        }
        self.kernel.sum_cos_sin(
            &buffer[..frames as usize * block_align],
            acc.width,
            acc.format.channels as usize,
            acc.frames,
            &self.table,
            self.trig.as_ref(),
            &mut acc.sums,
        );
        acc.frames += frames;
    }

    /// Squared magnitudes of everything accumulated so far.
    pub fn finish(&self, acc: &ProfileAccumulator) -> SpectralProfile {
        SpectralProfile::from_sums(
            acc.format.bits_per_sample,
            acc.frames,
            acc.format.channels as usize,
            &acc.sums,
        )
    }

    /// Normalized distance between two profiles on the [`DISTANCE_SCALE`] range.
    pub fn distance(&self, a: &SpectralProfile, b: &SpectralProfile) -> i64 {
        self.kernel.profile_distance(a, b, DISTANCE_SCALE)
    }
}
