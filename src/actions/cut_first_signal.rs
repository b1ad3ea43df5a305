use super::options::{load_reference, Duration};
use super::{copy_frames, Action};
use crate::cache::InputReader;
use crate::core::params::SearchParams;
use crate::core::types::{SampleIndex, ThresholdSpec};
use crate::error::Result;
use crate::io::sink::OutputSink;
use crate::search::{BoundarySearchEngine, SearchRequest, SearchResult};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "cut-first-signal",
    about = "Drop the first signal and the silence that follows it"
)]
pub struct CutFirstSignalArgs {
    /// Silent amplitude range: `N`, `min,max`, or one per channel joined by `|`.
    #[arg(long = "silencethreshold")]
    pub silence_threshold: String,
    /// Shortest silence that ends the first signal.
    #[arg(long = "silencemin")]
    pub silence_min: Duration,
    /// Noise profile used to refine the boundaries, or `none`.
    #[arg(long = "noisefft")]
    pub noise_fft: Option<PathBuf>,
}

/// Removes a leading signal (a count-in, a slate) up to the next signal after it.
#[derive(Debug, Clone)]
pub struct CutFirstSignal {
    args: CutFirstSignalArgs,
    params: SearchParams,
    start: Option<SampleIndex>,
}

impl CutFirstSignal {
    pub fn new(args: CutFirstSignalArgs, params: SearchParams) -> Self {
        Self {
            args,
            params,
            start: None,
        }
    }

    fn start(&mut self, input: &mut InputReader) -> Result<SampleIndex> {
        if let Some(start) = self.start {
            return Ok(start);
        }
        let start = self.locate(input)?;
        self.start = Some(start);
        Ok(start)
    }

    fn locate(&self, input: &mut InputReader) -> Result<SampleIndex> {
        let format = *input.format();
        let total = input.frame_count();
        let thresholds = ThresholdSpec::parse(&self.args.silence_threshold, format.channels)?;
        let reference = load_reference(self.args.noise_fft.as_deref())?;
        let min_silence = self.args.silence_min.to_frames(&format);
        let mut engine = BoundarySearchEngine::new(&format, self.params.clone())?;

        let signal = match engine.find_boundary(input, &SearchRequest::signal(0, &thresholds))? {
            SearchResult::Found(at) => at,
            _ => {
                log::warn!("No signal found. Keeping the whole file.");
                return Ok(0);
            }
        };

        let mut from = signal;
        let silence = loop {
            let request = SearchRequest::silence(from, &thresholds, min_silence)
                .with_reference(reference.as_ref());
            match engine.find_boundary(input, &request)? {
                SearchResult::Found(at) => break at,
                SearchResult::InterruptedByThreshold(at) => from = at,
                SearchResult::LimitReached => {
                    log::warn!(
                        "No silence found after the signal beginning at {}. Keeping the whole file.",
                        signal
                    );
                    return Ok(0);
                }
            }
        };

        let next = SearchRequest::signal(silence, &thresholds).with_reference(reference.as_ref());
        let start = match engine.find_boundary(input, &next)? {
            SearchResult::Found(at) | SearchResult::InterruptedByThreshold(at) => at,
            SearchResult::LimitReached => total,
        };
        log::info!(
            "First signal at {}, followed by silence at {}; keeping from {}",
            signal,
            silence,
            start
        );
        Ok(start)
    }
}

impl Action for CutFirstSignal {
    fn name(&self) -> &'static str {
        "cut-first-signal"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        let start = self.start(input)?;
        Ok(input.frame_count() - start)
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let start = self.start(input)?;
        let total = input.frame_count();
        if start < total {
            copy_frames(input, sink, start, total - 1)?;
        }
        Ok(())
    }
}
