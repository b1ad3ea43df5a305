//! Raw and decoded readers against known byte sources.

mod common;

use std::io::Cursor;

use common::*;
use wavsk::cache::Flow;
use wavsk::{CacheConfig, DecodedSampleReader, RawSampleReader, WavFormat};

fn ramp(n: usize) -> Vec<i32> {
    (0..n as i32).map(|i| (i * 37) % 20_000 - 10_000).collect()
}

#[test]
fn test_raw_reads_match_file_bytes() {
    let format = WavFormat::pcm(2, 44100, 24);
    let samples = ramp(2 * 5000);
    let bytes = wav_bytes(&format, &samples);
    let config = CacheConfig::new().with_raw_window_bytes(6 * 700);
    let mut raw = RawSampleReader::open(Cursor::new(bytes.clone()), &config).unwrap();

    assert_eq!(raw.frame_count(), 5000);
    for &(start, end) in &[(0u64, 0u64), (10, 20), (699, 701), (4000, 4999), (1234, 3456)] {
        let got = raw.read(start, end, 0).unwrap().to_vec();
        let lo = 44 + start as usize * 6;
        let hi = 44 + (end as usize + 1) * 6;
        assert_eq!(got, bytes[lo..hi].to_vec(), "range [{}, {}]", start, end);
    }
}

#[test]
fn test_rereads_inside_window_do_no_io() {
    let samples = ramp(10_000);
    let mut reader = mono_reader(8000, &samples);
    let first = reader.read(100, 199, 5000).unwrap().to_vec();
    let fetches = reader.fetch_count();

    assert_eq!(reader.read(100, 199, 0).unwrap(), &first[..]);
    assert_eq!(reader.read(150, 160, 0).unwrap(), &samples[150..=160]);
    assert_eq!(reader.read(4000, 5099, 0).unwrap(), &samples[4000..=5099]);
    assert_eq!(reader.fetch_count(), fetches);
}

#[test]
fn test_chunked_walk_matches_single_read() {
    let format = WavFormat::pcm(2, 8000, 16);
    let samples = ramp(2 * 3000);
    let config = CacheConfig::new()
        .with_raw_window_bytes(4 * 128)
        .with_decoded_window_values(2 * 100);
    let mut reader = reader_with(&format, &samples, &config);

    let mut walked = Vec::new();
    let mut next = 0u64;
    reader
        .for_each_range(0, 2999, 0, |first, values| {
            assert_eq!(first, next, "chunks must be contiguous");
            assert!(values.len() <= 2 * 100);
            next = first + (values.len() / 2) as u64;
            walked.extend_from_slice(values);
            Ok(Flow::Continue)
        })
        .unwrap();
    assert_eq!(next, 3000);
    assert_eq!(walked, samples);
}

#[test]
fn test_reversed_walk_visits_every_frame_once() {
    let samples = ramp(1000);
    let config = CacheConfig::new().with_decoded_window_values(64);
    let mut reader = reader_with(&WavFormat::pcm(1, 8000, 16), &samples, &config);

    let mut seen = Vec::new();
    let mut prev_first = u64::MAX;
    reader
        .for_each_range_reversed(0, 999, 0, |first, values| {
            assert!(first < prev_first, "chunks must move backward");
            prev_first = first;
            for (k, &v) in values.iter().enumerate().rev() {
                seen.push((first + k as u64, v));
            }
            Ok(Flow::Continue)
        })
        .unwrap();
    assert_eq!(seen.len(), 1000);
    for (n, &(idx, v)) in seen.iter().enumerate() {
        assert_eq!(idx, 999 - n as u64);
        assert_eq!(v, samples[idx as usize]);
    }
}

#[test]
fn test_stop_reports_frame() {
    let samples = layout(&[(0, 500), (7, 1)]);
    let mut reader = mono_reader(8000, &samples);
    let stopped = reader
        .for_each_range(0, 500, 0, |first, values| {
            match values.iter().position(|&v| v != 0) {
                Some(k) => Ok(Flow::StopAt(first + k as u64)),
                None => Ok(Flow::Continue),
            }
        })
        .unwrap();
    assert_eq!(stopped, Some(500));
}

#[test]
fn test_every_width_decodes_file_values() {
    for bits in [8u16, 16, 24, 32] {
        let format = WavFormat::pcm(1, 22050, bits);
        let samples: Vec<i32> = match bits {
            8 => vec![-128, -1, 0, 1, 127],
            16 => vec![i16::MIN as i32, -1, 0, 1, i16::MAX as i32],
            24 => vec![-(1 << 23), -1, 0, 1, (1 << 23) - 1],
            _ => vec![i32::MIN, -1, 0, 1, i32::MAX],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("w{}.wav", bits));
        std::fs::write(&path, wav_bytes(&format, &samples)).unwrap();

        let (read_format, values) = read_all(&path);
        assert_eq!(read_format, format);
        assert_eq!(values, samples, "{}-bit", bits);
    }
}

#[test]
fn test_out_of_range_read_is_rejected() {
    let mut reader = mono_reader(8000, &ramp(10));
    assert!(reader.read(5, 10, 0).is_err());
    assert!(reader.read(6, 5, 0).is_err());
}

#[test]
fn test_decoded_reader_owns_raw_reader() {
    let bytes = wav_bytes(&WavFormat::pcm(1, 8000, 16), &ramp(100));
    let raw = RawSampleReader::open(Cursor::new(bytes), &CacheConfig::new()).unwrap();
    let mut decoded = DecodedSampleReader::new(raw, &CacheConfig::new()).unwrap();
    assert_eq!(decoded.raw().frame_count(), 100);
    assert_eq!(decoded.raw_mut().read(0, 0, 0).unwrap().len(), 2);
}
