use super::options::{load_reference, Duration};
use super::{copy_frames, Action};
use crate::cache::InputReader;
use crate::core::params::SearchParams;
use crate::core::types::{Direction, SampleIndex, ThresholdSpec};
use crate::error::Result;
use crate::io::sink::OutputSink;
use crate::search::{BoundarySearchEngine, SearchRequest, SearchResult};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "silence-remover", about = "Trim leading and trailing silence")]
pub struct SilenceRemoverArgs {
    /// Silent amplitude range: `N`, `min,max`, or one per channel joined by `|`.
    #[arg(long = "silencethreshold")]
    pub silence_threshold: String,
    /// Frames kept before the first signal.
    #[arg(long, default_value = "0")]
    pub attack: Duration,
    /// Frames kept after the last signal.
    #[arg(long, default_value = "0")]
    pub release: Duration,
    /// Noise profile used to extend the end through decaying tails, or `none`.
    #[arg(long = "noisefft")]
    pub noise_fft: Option<PathBuf>,
}

/// Keeps everything between the first and last non-silent frames.
#[derive(Debug, Clone)]
pub struct SilenceRemover {
    args: SilenceRemoverArgs,
    params: SearchParams,
    kept: Option<Option<(SampleIndex, SampleIndex)>>,
}

impl SilenceRemover {
    pub fn new(args: SilenceRemoverArgs, params: SearchParams) -> Self {
        Self {
            args,
            params,
            kept: None,
        }
    }

    fn kept_range(&mut self, input: &mut InputReader) -> Result<Option<(SampleIndex, SampleIndex)>> {
        if let Some(kept) = self.kept {
            return Ok(kept);
        }
        let kept = self.locate(input)?;
        self.kept = Some(kept);
        Ok(kept)
    }

    fn locate(&self, input: &mut InputReader) -> Result<Option<(SampleIndex, SampleIndex)>> {
        let format = *input.format();
        let total = input.frame_count();
        let thresholds = ThresholdSpec::parse(&self.args.silence_threshold, format.channels)?;
        let reference = load_reference(self.args.noise_fft.as_deref())?;
        let mut engine = BoundarySearchEngine::new(&format, self.params.clone())?;

        let first = match engine.find_boundary(input, &SearchRequest::signal(0, &thresholds))? {
            SearchResult::Found(at) => at,
            _ => {
                log::info!("The whole input file is silent.");
                return Ok(None);
            }
        };
        let backward = SearchRequest::signal(total - 1, &thresholds).with_direction(Direction::Backward);
        let mut last = match engine.find_boundary(input, &backward)? {
            SearchResult::Found(at) => at,
            _ => first,
        };
        log::info!("Found signal between frames {} and {} of {}", first, last, total);

        if let Some(reference) = &reference {
            if last + 1 < total {
                let tail = SearchRequest::silence(last + 1, &thresholds, 1).with_reference(Some(reference));
                let end = match engine.find_boundary(input, &tail)? {
                    SearchResult::Found(at) | SearchResult::InterruptedByThreshold(at) => at - 1,
                    SearchResult::LimitReached => total - 1,
                };
                if end > last {
                    log::debug!("Moved last signal frame from {} to {}", last, end);
                }
                last = end.max(last);
            }
        }

        let attack = self.args.attack.to_frames(&format);
        let release = self.args.release.to_frames(&format);
        let begin = if attack > first {
            log::warn!(
                "Attack of {} frames reaches before the start; keeping from frame 0",
                attack
            );
            0
        } else {
            first - attack
        };
        let end = if last + release >= total {
            if release > 0 {
                log::warn!(
                    "Release of {} frames reaches past the end; keeping until frame {}",
                    release,
                    total - 1
                );
            }
            total - 1
        } else {
            last + release
        };
        Ok(Some((begin, end)))
    }
}

impl Action for SilenceRemover {
    fn name(&self) -> &'static str {
        "silence-remover"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        Ok(self
            .kept_range(input)?
            .map_or(0, |(begin, end)| end - begin + 1))
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        if let Some((begin, end)) = self.kept_range(input)? {
            copy_frames(input, sink, begin, end)?;
        }
        Ok(())
    }
}
