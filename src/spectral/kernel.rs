//! Numeric kernels behind spectral profiling.
//!
//! The trigonometric summation and the profile distance are the hot loops of
//! every spectral search. They sit behind [`NumericKernel`] so an accelerated
//! backend can replace [`ReferenceKernel`] without touching the search code.

use super::profile::{FrequencyTable, SpectralProfile, TrigCache};
use crate::io::wav::SampleWidth;
use rustfft::num_complex::Complex;

/// Running `(Σ x·cos, Σ x·sin)` per bin and channel, indexed `bin * channels + channel`.
pub type CosSinSums = Vec<Complex<i64>>;

/// Summation and distance primitives.
pub trait NumericKernel {
    /// Adds `trunc(x[t]·cos(ω·t))` and `trunc(x[t]·sin(ω·t))` for every frame
    /// of `buffer` into `sums`, with `t` starting at `first_t`.
    ///
    /// `trig` holds precomputed angles for `t < trig.len()`; later `t` are
    /// evaluated directly.
    #[allow(clippy::too_many_arguments)]
    fn sum_cos_sin(
        &self,
        buffer: &[u8],
        width: SampleWidth,
        channels: usize,
        first_t: u64,
        table: &FrequencyTable,
        trig: Option<&TrigCache>,
        sums: &mut [Complex<i64>],
    );

    /// Largest absolute difference between the normalized magnitudes of `a`
    /// and `b`, scaled by `scale`.
    fn profile_distance(&self, a: &SpectralProfile, b: &SpectralProfile, scale: i64) -> i64;
}

/// Portable scalar implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceKernel;

impl NumericKernel for ReferenceKernel {
    fn sum_cos_sin(
        &self,
        buffer: &[u8],
        width: SampleWidth,
        channels: usize,
        first_t: u64,
        table: &FrequencyTable,
        trig: Option<&TrigCache>,
        sums: &mut [Complex<i64>],
    ) {
        let channels = channels.max(1);
        let mut values = Vec::with_capacity(buffer.len() / width.bytes());
        width.decode(buffer, &mut values);

        for (frame_idx, frame) in values.chunks_exact(channels).enumerate() {
            let t = first_t + frame_idx as u64;
            let cached = trig.filter(|c| t < c.len() as u64);
            for (bin, &omega) in table.omegas().iter().enumerate() {
                let (cos, sin) = match cached {
                    Some(c) => c.get(bin, t as usize),
                    None => {
                        let angle = omega * t as f64;
                        (angle.cos(), angle.sin())
                    }
                };
                let row = &mut sums[bin * channels..(bin + 1) * channels];
                for (acc, &x) in row.iter_mut().zip(frame) {
                    let x = x as f64;
                    acc.re += (x * cos) as i64;
                    acc.im += (x * sin) as i64;
                }
            }
        }
    }

    fn profile_distance(&self, a: &SpectralProfile, b: &SpectralProfile, scale: i64) -> i64 {
        let bound_a = a.bound();
        let bound_b = b.bound();
        let mut max_dist = 0.0f64;
        for (row_a, row_b) in a.magnitudes.iter().zip(&b.magnitudes) {
            for (&ma, &mb) in row_a.iter().zip(row_b) {
                let dist = (normalize(mb, bound_b) - normalize(ma, bound_a)).abs();
                if dist > max_dist {
                    max_dist = dist;
                }
            }
        }
        (max_dist * scale as f64) as i64
    }
}

#[inline]
fn normalize(magnitude: u128, bound: f64) -> f64 {
    if bound > 0.0 {
        magnitude as f64 / bound
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode16(values: &[i32]) -> Vec<u8> {
        let mut out = Vec::new();
        SampleWidth::I16.encode(values, &mut out);
        out
    }

    #[test]
    fn test_cached_and_direct_sums_agree() {
        let table = FrequencyTable::new(8000);
        let trig = TrigCache::new(&table, 64);
        let values: Vec<i32> = (0..64).map(|i| ((i * 37) % 200) - 100).collect();
        let bytes = encode16(&values);
        let mut direct = vec![Complex::new(0, 0); table.len()];
        let mut cached = direct.clone();
        ReferenceKernel.sum_cos_sin(&bytes, SampleWidth::I16, 1, 0, &table, None, &mut direct);
        ReferenceKernel.sum_cos_sin(&bytes, SampleWidth::I16, 1, 0, &table, Some(&trig), &mut cached);
        assert_eq!(direct, cached);
    }

    #[test]
    fn test_split_buffers_continue_time() {
        let table = FrequencyTable::new(8000);
        let values: Vec<i32> = (0..100).map(|i| (i * 91 % 500) - 250).collect();
        let bytes = encode16(&values);
        let mut whole = vec![Complex::new(0, 0); table.len()];
        ReferenceKernel.sum_cos_sin(&bytes, SampleWidth::I16, 1, 0, &table, None, &mut whole);
        let mut split = vec![Complex::new(0, 0); table.len()];
        ReferenceKernel.sum_cos_sin(&bytes[..80], SampleWidth::I16, 1, 0, &table, None, &mut split);
        ReferenceKernel.sum_cos_sin(&bytes[80..], SampleWidth::I16, 1, 40, &table, None, &mut split);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_dc_signal_sums_cosine_at_t0() {
        let table = FrequencyTable::new(44100);
        let bytes = encode16(&[1000]);
        let mut sums = vec![Complex::new(0, 0); table.len()];
        ReferenceKernel.sum_cos_sin(&bytes, SampleWidth::I16, 1, 0, &table, None, &mut sums);
        assert!(sums.iter().all(|c| c.re == 1000 && c.im == 0));
    }
}
