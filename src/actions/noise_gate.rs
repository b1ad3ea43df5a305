use super::options::{load_reference, Duration};
use super::{copy_frames, Action};
use crate::cache::window::Flow;
use crate::cache::InputReader;
use crate::core::params::SearchParams;
use crate::core::types::{SampleIndex, ThresholdSpec};
use crate::error::Result;
use crate::io::sink::OutputSink;
use crate::search::{find_non_silent_runs, merge_short_gaps, BoundarySearchEngine, NonSilentRun, RunQuery};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "noise-gate", about = "Replace long silences with digital silence")]
pub struct NoiseGateArgs {
    /// Silent amplitude range: `N`, `min,max`, or one per channel joined by `|`.
    #[arg(long = "silencethreshold")]
    pub silence_threshold: String,
    /// Shortest silence that gets muted.
    #[arg(long = "silencemin")]
    pub silence_min: Duration,
    /// Fade-in length before each kept run.
    #[arg(long, default_value = "0")]
    pub attack: Duration,
    /// Fade-out length after each kept run.
    #[arg(long, default_value = "0")]
    pub release: Duration,
    /// Noise profile used to refine the boundaries, or `none`.
    #[arg(long = "noisefft")]
    pub noise_fft: Option<PathBuf>,
}

/// Mutes silences longer than `--silencemin`, fading around the kept runs.
///
/// The output always has the input's length.
#[derive(Debug, Clone)]
pub struct NoiseGate {
    args: NoiseGateArgs,
    params: SearchParams,
}

impl NoiseGate {
    pub fn new(args: NoiseGateArgs, params: SearchParams) -> Self {
        Self { args, params }
    }

    fn kept_runs(&self, input: &mut InputReader) -> Result<Vec<NonSilentRun>> {
        let format = *input.format();
        let thresholds = ThresholdSpec::parse(&self.args.silence_threshold, format.channels)?;
        let reference = load_reference(self.args.noise_fft.as_deref())?;
        let min_silence = self.args.silence_min.to_frames(&format).max(1);
        let mut engine = BoundarySearchEngine::new(&format, self.params.clone())?;

        let query = RunQuery::new(&thresholds, min_silence).with_reference(reference.as_ref());
        let runs = find_non_silent_runs(&mut engine, input, query)?;
        let merged = merge_short_gaps(&runs, min_silence - 1);
        log::info!(
            "Found {} non-silent runs ({} after merging short gaps)",
            runs.len(),
            merged.len()
        );
        Ok(merged)
    }
}

impl Action for NoiseGate {
    fn name(&self) -> &'static str {
        "noise-gate"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        Ok(input.frame_count())
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let total = input.frame_count();
        if total == 0 {
            return Ok(());
        }
        let format = *input.format();
        let attack = self.args.attack.to_frames(&format);
        let release = self.args.release.to_frames(&format);
        let runs = self.kept_runs(input)?;

        let mut next_to_write: SampleIndex = 0;
        for (i, run) in runs.iter().enumerate() {
            let fade_in_start = run.first.saturating_sub(attack).max(next_to_write);
            sink.push_silence(fade_in_start - next_to_write)?;
            if fade_in_start < run.first {
                let first = run.first;
                push_scaled(input, sink, fade_in_start, first - 1, |idx, v| {
                    let k = attack - (first - idx);
                    scale(v, k, attack)
                })?;
            }

            copy_frames(input, sink, run.first, run.last)?;

            let ceiling = match runs.get(i + 1) {
                Some(next) => next.first - 1,
                None => total - 1,
            };
            let fade_out_end = run.last.saturating_add(release).min(ceiling);
            if fade_out_end > run.last {
                let last = run.last;
                push_scaled(input, sink, last + 1, fade_out_end, |idx, v| {
                    let k = idx - last - 1;
                    scale(v, release - k, release)
                })?;
            }
            next_to_write = fade_out_end + 1;
        }
        sink.push_silence(total - next_to_write)?;
        Ok(())
    }
}

/// `value * num / den`, floored.
fn scale(value: i32, num: u64, den: u64) -> i32 {
    (value as i64 * num as i64).div_euclid(den as i64) as i32
}

/// Writes frames `[first, last]` with every value passed through `gain`.
fn push_scaled<F>(
    input: &mut InputReader,
    sink: &mut dyn OutputSink,
    first: SampleIndex,
    last: SampleIndex,
    gain: F,
) -> Result<()>
where
    F: Fn(SampleIndex, i32) -> i32,
{
    let channels = input.channels();
    let mut scaled = Vec::new();
    input.for_each_range(first, last, 0, |at, values| {
        scaled.clear();
        for (i, frame) in values.chunks_exact(channels).enumerate() {
            let idx = at + i as u64;
            scaled.extend(frame.iter().map(|&v| gain(idx, v)));
        }
        sink.push_frames(&scaled)?;
        Ok(Flow::Continue)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_floors() {
        assert_eq!(scale(100, 1, 4), 25);
        assert_eq!(scale(-7, 1, 2), -4);
        assert_eq!(scale(1000, 0, 10), 0);
        assert_eq!(scale(1000, 10, 10), 1000);
    }
}
