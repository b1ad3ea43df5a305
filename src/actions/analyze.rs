use super::Action;
use crate::cache::window::Flow;
use crate::cache::InputReader;
use crate::core::types::WavFormat;
use crate::error::{Result, WskError};
use crate::io::sink::OutputSink;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "analyze", about = "Report per-channel levels of the input")]
pub struct AnalyzeArgs {
    /// Where to store the JSON report.
    #[arg(long, default_value = "analyze.result")]
    pub result: PathBuf,
}

/// Levels of one channel. Decibels are relative to full scale and absent for 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLevels {
    pub min: i64,
    pub max: i64,
    /// DC offset.
    pub mean: f64,
    pub abs_max: i64,
    pub abs_mean: f64,
    pub rms: i64,
    pub min_db: Option<f64>,
    pub max_db: Option<f64>,
    pub mean_db: Option<f64>,
    pub abs_max_db: Option<f64>,
    pub abs_mean_db: Option<f64>,
    pub rms_db: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeReport {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channel_count: u16,
    /// Bytes per second.
    pub data_rate: u32,
    pub frame_count: u64,
    pub duration_seconds: f64,
    pub min_possible_value: i64,
    pub max_possible_value: i64,
    pub channels: Vec<ChannelLevels>,
    pub abs_max: i64,
    pub abs_max_db: Option<f64>,
    pub abs_max_percent: f64,
    pub abs_mean: f64,
    pub abs_mean_db: Option<f64>,
    pub abs_mean_percent: f64,
}

impl AnalyzeReport {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| WskError::IoError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| WskError::InvalidFormat(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| WskError::IoError(format!("{}: {}", path.display(), e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| WskError::IoError(format!("{}: {}", path.display(), e)))
    }
}

/// Running sums for one channel.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    min: i64,
    max: i64,
    sum: i128,
    abs_sum: u128,
    square_sum: u128,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            min: i64::MAX,
            max: i64::MIN,
            sum: 0,
            abs_sum: 0,
            square_sum: 0,
        }
    }

    #[inline]
    fn add(&mut self, value: i32) {
        let v = value as i64;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += v as i128;
        self.abs_sum += v.unsigned_abs() as u128;
        self.square_sum += (v.unsigned_abs() as u128).pow(2);
    }

    fn levels(&self, frames: u64, full_scale: f64) -> ChannelLevels {
        let n = frames.max(1) as f64;
        let (min, max) = if frames == 0 { (0, 0) } else { (self.min, self.max) };
        let mean = self.sum as f64 / n;
        let abs_mean = self.abs_sum as f64 / n;
        let abs_max = min.unsigned_abs().max(max.unsigned_abs()) as i64;
        let rms = (self.square_sum as f64 / n).sqrt().round() as i64;
        ChannelLevels {
            min,
            max,
            mean,
            abs_max,
            abs_mean,
            rms,
            min_db: to_db(min as f64, full_scale),
            max_db: to_db(max as f64, full_scale),
            mean_db: to_db(mean, full_scale),
            abs_max_db: to_db(abs_max as f64, full_scale),
            abs_mean_db: to_db(abs_mean, full_scale),
            rms_db: to_db(rms as f64, full_scale),
        }
    }
}

/// 6 dB per halving of `|value|` below `full_scale`.
fn to_db(value: f64, full_scale: f64) -> Option<f64> {
    if value == 0.0 {
        return None;
    }
    Some(-6.0 * (full_scale / value.abs()).log2())
}

fn percent(value: f64, full_scale: f64) -> f64 {
    value.abs() * 100.0 / full_scale
}

/// Builds the report from per-channel accumulators.
fn build_report(format: &WavFormat, frames: u64, channels: &[Accumulator]) -> AnalyzeReport {
    let (min_possible, max_possible) = format.value_range();
    let full_scale = -(min_possible as f64);
    let levels: Vec<ChannelLevels> = channels.iter().map(|a| a.levels(frames, full_scale)).collect();
    let abs_max = levels.iter().map(|l| l.abs_max).max().unwrap_or(0);
    let abs_mean = if levels.is_empty() {
        0.0
    } else {
        levels.iter().map(|l| l.abs_mean).sum::<f64>() / levels.len() as f64
    };
    AnalyzeReport {
        sample_rate: format.sample_rate,
        bits_per_sample: format.bits_per_sample,
        channel_count: format.channels,
        data_rate: format.byte_rate(),
        frame_count: frames,
        duration_seconds: frames as f64 / format.sample_rate.max(1) as f64,
        min_possible_value: min_possible,
        max_possible_value: max_possible,
        channels: levels,
        abs_max,
        abs_max_db: to_db(abs_max as f64, full_scale),
        abs_max_percent: percent(abs_max as f64, full_scale),
        abs_mean,
        abs_mean_db: to_db(abs_mean, full_scale),
        abs_mean_percent: percent(abs_mean, full_scale),
    }
}

/// Measures the input and saves an [`AnalyzeReport`]. Writes no frames.
#[derive(Debug, Clone)]
pub struct Analyze {
    args: AnalyzeArgs,
}

impl Analyze {
    pub fn new(args: AnalyzeArgs) -> Self {
        Self { args }
    }
}

impl Action for Analyze {
    fn name(&self) -> &'static str {
        "analyze"
    }

    fn expected_sample_count(&mut self, _input: &mut InputReader) -> Result<u64> {
        Ok(0)
    }

    fn execute(&mut self, input: &mut InputReader, _sink: &mut dyn OutputSink) -> Result<()> {
        let format = *input.format();
        let channels = input.channels();
        let frames = input.frame_count();
        let mut sums = vec![Accumulator::new(); channels];
        if frames > 0 {
            input.for_each_range(0, frames - 1, 0, |_, values| {
                for frame in values.chunks_exact(channels) {
                    for (acc, &v) in sums.iter_mut().zip(frame) {
                        acc.add(v);
                    }
                }
                Ok(Flow::Continue)
            })?;
        }

        let report = build_report(&format, frames, &sums);
        for (ch, l) in report.channels.iter().enumerate() {
            log::info!(
                "Channel {}: min {} max {} DC offset {:.3} RMS {} abs max {} abs mean {:.3}",
                ch,
                l.min,
                l.max,
                l.mean,
                l.rms,
                l.abs_max,
                l.abs_mean
            );
        }
        log::info!(
            "{} frames ({:.3} s), {}; max absolute value {} ({:.2} %)",
            report.frame_count,
            report.duration_seconds,
            format,
            report.abs_max,
            report.abs_max_percent
        );
        report.save(&self.args.result)?;
        log::info!("Analysis saved to {}", self.args.result.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_scale() {
        assert_eq!(to_db(0.0, 32768.0), None);
        assert_eq!(to_db(32768.0, 32768.0), Some(0.0));
        assert_eq!(to_db(-16384.0, 32768.0), Some(-6.0));
    }

    #[test]
    fn test_levels_of_known_values() {
        let mut acc = Accumulator::new();
        for v in [3, -4, 3, -4] {
            acc.add(v);
        }
        let levels = acc.levels(4, 32768.0);
        assert_eq!((levels.min, levels.max, levels.abs_max), (-4, 3, 4));
        assert_eq!(levels.mean, -0.5);
        assert_eq!(levels.abs_mean, 3.5);
        // sqrt((9 + 16 + 9 + 16) / 4) = 3.54
        assert_eq!(levels.rms, 4);
    }
}
