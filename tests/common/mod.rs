#![allow(dead_code)]

use std::f64::consts::PI;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use wavsk::spectral::profile::SpectralProfile;
use wavsk::spectral::DISTANCE_SCALE;
use wavsk::{CacheConfig, DecodedSampleReader, NoiseProfile, WavFormat};

pub type MemReader = DecodedSampleReader<Cursor<Vec<u8>>>;

/// `n` frames of a sine at `freq_hz`, amplitude given per frame index.
pub fn gen_tone<F>(freq_hz: f64, sr: u32, n: usize, amp_fn: F) -> Vec<i32>
where
    F: Fn(usize) -> f64,
{
    (0..n)
        .map(|i| (amp_fn(i) * (2.0 * PI * freq_hz * i as f64 / sr as f64).sin()).round() as i32)
        .collect()
}

/// Concatenates `(value, count)` blocks of constant frames.
pub fn layout(parts: &[(i32, usize)]) -> Vec<i32> {
    parts
        .iter()
        .flat_map(|&(v, n)| std::iter::repeat(v).take(n))
        .collect()
}

/// Deterministic noise in `[-amp, amp]` from a small LCG.
pub fn gen_noise(seed: u32, n: usize, amp: i32) -> Vec<i32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 16) as i32 % (2 * amp + 1)) - amp
        })
        .collect()
}

/// Piecewise-constant-amplitude 440 Hz tone: `amps[k]` covers frames `[k*len, (k+1)*len)`.
pub fn gen_stepped_tone(sr: u32, len: usize, amps: &[f64]) -> Vec<i32> {
    gen_tone(440.0, sr, len * amps.len(), |i| amps[i / len])
}

pub fn wav_bytes(format: &WavFormat, samples: &[i32]) -> Vec<u8> {
    wavsk::io::write_wav(format, samples).unwrap()
}

pub fn mono_reader(sr: u32, samples: &[i32]) -> MemReader {
    reader_with(&WavFormat::pcm(1, sr, 16), samples, &CacheConfig::new())
}

pub fn reader_with(format: &WavFormat, samples: &[i32], config: &CacheConfig) -> MemReader {
    DecodedSampleReader::open(Cursor::new(wav_bytes(format, samples)), config).unwrap()
}

/// Writes a mono 16-bit WAV into `dir` and returns its path.
pub fn write_mono_file(dir: &Path, name: &str, sr: u32, samples: &[i32]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, wav_bytes(&WavFormat::pcm(1, sr, 16), samples)).unwrap();
    path
}

/// Every channel value of a WAV file on disk.
pub fn read_all(path: &Path) -> (WavFormat, Vec<i32>) {
    let file = std::fs::File::open(path).unwrap();
    let mut reader = DecodedSampleReader::open(file, &CacheConfig::new()).unwrap();
    let format = *reader.format();
    let total = reader.frame_count();
    if total == 0 {
        return (format, Vec::new());
    }
    let values = reader.read(0, total - 1, 0).unwrap().to_vec();
    (format, values)
}

/// A reference that treats every probe as equally far from the noise floor.
pub fn zero_reference(channels: usize) -> NoiseProfile {
    NoiseProfile {
        average_distance: DISTANCE_SCALE,
        profile: SpectralProfile {
            bits_per_sample: 16,
            sample_count: 800,
            magnitudes: vec![vec![0; channels]; 139],
        },
    }
}

pub fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
