use crate::error::{Result, WskError};
use std::fmt;

/// Frame ordinal inside a WAV data chunk.
pub type SampleIndex = u64;

/// PCM layout of a WAV stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// WAVE format tag (1 = PCM).
    pub format_tag: u16,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Width of one channel value in bits (8, 16, 24 or 32).
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Creates a PCM format description.
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            format_tag: 1,
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    /// Bytes per interleaved frame.
    #[inline]
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes per second of audio.
    #[inline]
    pub fn byte_rate(&self) -> u32 {
        self.block_align() as u32 * self.sample_rate
    }

    /// Number of frames needed to cover `seconds` of audio, rounded to nearest.
    pub fn frames_for_seconds(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64).round().max(0.0) as u64
    }

    /// Smallest and largest channel value at this bit depth.
    pub fn value_range(&self) -> (i64, i64) {
        let half = 1i64 << (self.bits_per_sample.clamp(1, 32) - 1);
        (-half, half - 1)
    }
}

impl fmt::Display for WavFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} channel(s), {} bits",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// Scan direction through a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The opposite scan direction.
    #[inline]
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Moves `index` by `n` frames in this direction, saturating at 0.
    #[inline]
    pub fn advance(self, index: SampleIndex, n: u64) -> SampleIndex {
        match self {
            Direction::Forward => index.saturating_add(n),
            Direction::Backward => index.saturating_sub(n),
        }
    }

    /// True when `index` has not yet moved past `limit` in this direction.
    #[inline]
    pub fn within(self, index: SampleIndex, limit: SampleIndex) -> bool {
        match self {
            Direction::Forward => index <= limit,
            Direction::Backward => index >= limit,
        }
    }

    /// Number of frames from `from` to `to` inclusive, 0 if `to` is behind `from`.
    #[inline]
    pub fn span(self, from: SampleIndex, to: SampleIndex) -> u64 {
        match self {
            Direction::Forward if to >= from => to - from + 1,
            Direction::Backward if from >= to => from - to + 1,
            _ => 0,
        }
    }
}

/// Per-channel inclusive amplitude ranges considered silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSpec {
    ranges: Vec<(i32, i32)>,
}

impl ThresholdSpec {
    /// Builds a spec from explicit `(min, max)` pairs, one per channel.
    pub fn new(ranges: Vec<(i32, i32)>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(WskError::InvalidArgument(
                "threshold needs at least one channel range".to_string(),
            ));
        }
        for &(lo, hi) in &ranges {
            if lo > hi {
                return Err(WskError::InvalidArgument(format!(
                    "threshold range {},{} has min above max",
                    lo, hi
                )));
            }
        }
        Ok(Self { ranges })
    }

    /// Same symmetric range `[-amplitude, amplitude]` on every channel.
    pub fn symmetric(amplitude: i32, channels: u16) -> Self {
        let a = amplitude.saturating_abs();
        Self {
            ranges: vec![(-a, a); channels.max(1) as usize],
        }
    }

    /// Parses `N`, `min,max`, or per-channel lists joined with `|`.
    ///
    /// A single entry applies to every channel.
    pub fn parse(text: &str, channels: u16) -> Result<Self> {
        let parts: Vec<&str> = text.split('|').map(str::trim).collect();
        let mut ranges = Vec::with_capacity(parts.len());
        for part in &parts {
            ranges.push(parse_range(part)?);
        }
        let channels = channels.max(1) as usize;
        if ranges.len() == 1 {
            ranges = vec![ranges[0]; channels];
        } else if ranges.len() != channels {
            return Err(WskError::InvalidArgument(format!(
                "threshold '{}' lists {} channels, stream has {}",
                text,
                ranges.len(),
                channels
            )));
        }
        Self::new(ranges)
    }

    /// Number of channels covered.
    pub fn channels(&self) -> usize {
        self.ranges.len()
    }

    /// Range for `channel`.
    pub fn range(&self, channel: usize) -> (i32, i32) {
        self.ranges[channel % self.ranges.len()]
    }

    /// True when every channel value of `frame` lies inside its range.
    #[inline]
    pub fn is_silent(&self, frame: &[i32]) -> bool {
        frame.iter().enumerate().all(|(ch, &v)| {
            let (lo, hi) = self.range(ch);
            v >= lo && v <= hi
        })
    }
}

fn parse_range(part: &str) -> Result<(i32, i32)> {
    let bad = || WskError::InvalidArgument(format!("invalid threshold '{}'", part));
    match part.split_once(',') {
        Some((lo, hi)) => {
            let lo: i32 = lo.trim().parse().map_err(|_| bad())?;
            let hi: i32 = hi.trim().parse().map_err(|_| bad())?;
            Ok((lo, hi))
        }
        None => {
            let n: i32 = part.parse().map_err(|_| bad())?;
            let a = n.checked_abs().ok_or_else(bad)?;
            Ok((-a, a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_align_and_byte_rate() {
        let fmt = WavFormat::pcm(2, 44100, 24);
        assert_eq!(fmt.block_align(), 6);
        assert_eq!(fmt.byte_rate(), 264600);
    }

    #[test]
    fn test_value_range_per_width() {
        assert_eq!(WavFormat::pcm(1, 8000, 8).value_range(), (-128, 127));
        assert_eq!(WavFormat::pcm(2, 8000, 24).value_range(), (-8_388_608, 8_388_607));
        assert_eq!(
            WavFormat::pcm(1, 8000, 32).value_range(),
            (i32::MIN as i64, i32::MAX as i64)
        );
    }

    #[test]
    fn test_frames_for_seconds_rounds() {
        let fmt = WavFormat::pcm(1, 44100, 16);
        assert_eq!(fmt.frames_for_seconds(0.1), 4410);
        assert_eq!(fmt.frames_for_seconds(25.3), 1115730);
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::Forward.advance(10, 3), 13);
        assert_eq!(Direction::Backward.advance(2, 3), 0);
        assert!(Direction::Backward.within(5, 5));
        assert!(!Direction::Forward.within(6, 5));
        assert_eq!(Direction::Forward.span(3, 7), 5);
        assert_eq!(Direction::Backward.span(7, 3), 5);
        assert_eq!(Direction::Forward.span(7, 3), 0);
    }

    #[test]
    fn test_threshold_parse_symmetric() {
        let spec = ThresholdSpec::parse("100", 2).unwrap();
        assert_eq!(spec.channels(), 2);
        assert_eq!(spec.range(1), (-100, 100));
        assert!(spec.is_silent(&[100, -100]));
        assert!(!spec.is_silent(&[101, 0]));
    }

    #[test]
    fn test_threshold_parse_per_channel() {
        let spec = ThresholdSpec::parse("-10,20|5", 2).unwrap();
        assert_eq!(spec.range(0), (-10, 20));
        assert_eq!(spec.range(1), (-5, 5));
        assert!(spec.is_silent(&[20, 5]));
        assert!(!spec.is_silent(&[-11, 0]));
    }

    #[test]
    fn test_threshold_parse_errors() {
        assert!(ThresholdSpec::parse("abc", 1).is_err());
        assert!(ThresholdSpec::parse("5,1", 1).is_err());
        assert!(ThresholdSpec::parse("1|2|3", 2).is_err());
    }

    #[test]
    fn test_threshold_extreme_amplitudes() {
        assert!(matches!(
            ThresholdSpec::parse("-2147483648", 1),
            Err(WskError::InvalidArgument(_))
        ));
        let spec = ThresholdSpec::parse("-2147483648,2147483647", 1).unwrap();
        assert_eq!(spec.range(0), (i32::MIN, i32::MAX));
        assert_eq!(ThresholdSpec::symmetric(i32::MIN, 1).range(0), (-i32::MAX, i32::MAX));
    }
}
