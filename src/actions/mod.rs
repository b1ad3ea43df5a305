//! Actions: whole-file transformations driven by the dispatcher.
//!
//! An action first declares how many frames it will write (so the output
//! header can be emitted up front), then streams them into an [`OutputSink`].

pub mod analyze;
pub mod compare;
pub mod cut;
pub mod cut_first_signal;
pub mod dc_shifter;
pub mod fft;
pub mod identity;
pub mod mix;
pub mod noise_gate;
pub mod options;
pub mod silence_inserter;
pub mod silence_remover;

use crate::cache::window::Flow;
use crate::cache::{DecodedSampleReader, InputReader, MediaSource};
use crate::core::params::{CacheConfig, SearchParams};
use crate::core::types::{SampleIndex, WavFormat};
use crate::error::{Result, WskError};
use crate::io::sink::{OutputSink, WavSink};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

pub use analyze::{Analyze, AnalyzeReport};
pub use compare::Compare;
pub use cut::Cut;
pub use cut_first_signal::CutFirstSignal;
pub use dc_shifter::DcShifter;
pub use fft::Fft;
pub use identity::Identity;
pub use mix::Mix;
pub use noise_gate::NoiseGate;
pub use options::Duration;
pub use silence_inserter::SilenceInserter;
pub use silence_remover::SilenceRemover;

/// Names accepted by [`create_action`].
pub const ACTION_NAMES: [&str; 11] = [
    "identity",
    "cut",
    "fft",
    "silence-remover",
    "cut-first-signal",
    "noise-gate",
    "silence-inserter",
    "dc-shifter",
    "compare",
    "mix",
    "analyze",
];

/// Frames combined per step when several inputs are read side by side.
const ALIGNED_CHUNK_FRAMES: u64 = 64 * 1024;

/// A whole-file transformation.
pub trait Action {
    fn name(&self) -> &'static str;

    /// Number of frames [`execute`](Action::execute) will write.
    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64>;

    /// Streams the output frames into `sink`.
    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()>;
}

/// Builds the action `name` from its command-line options.
pub fn create_action(name: &str, args: &[String], params: &SearchParams) -> Result<Box<dyn Action>> {
    let action: Box<dyn Action> = match name {
        "identity" => Box::new(Identity),
        "cut" => Box::new(Cut::new(parse_args(name, args)?)),
        "fft" => Box::new(Fft::new(parse_args(name, args)?, params.clone())),
        "silence-remover" => Box::new(SilenceRemover::new(parse_args(name, args)?, params.clone())),
        "cut-first-signal" => Box::new(CutFirstSignal::new(parse_args(name, args)?, params.clone())),
        "noise-gate" => Box::new(NoiseGate::new(parse_args(name, args)?, params.clone())),
        "silence-inserter" => Box::new(SilenceInserter::new(parse_args(name, args)?)),
        "dc-shifter" => Box::new(DcShifter::new(parse_args(name, args)?)),
        "compare" => Box::new(Compare::new(parse_args(name, args)?)),
        "mix" => Box::new(Mix::new(parse_args(name, args)?)),
        "analyze" => Box::new(Analyze::new(parse_args(name, args)?)),
        other => {
            return Err(WskError::InvalidArgument(format!(
                "unknown action '{}' (available: {})",
                other,
                ACTION_NAMES.join(", ")
            )))
        }
    };
    Ok(action)
}

fn parse_args<T: Parser>(name: &str, args: &[String]) -> Result<T> {
    T::try_parse_from(std::iter::once(name.to_string()).chain(args.iter().cloned()))
        .map_err(|e| WskError::InvalidArgument(e.to_string()))
}

/// Opens `path` as an action input.
pub fn open_input(path: &Path, config: &CacheConfig) -> Result<InputReader> {
    let file = File::open(path).map_err(|e| WskError::IoError(format!("{}: {}", path.display(), e)))?;
    let source: Box<dyn MediaSource> = Box::new(file);
    DecodedSampleReader::open(source, config)
}

/// Runs `action` from `input` to a new file at `output`.
///
/// Returns the number of frames the action itself produced. The output is
/// padded with silence when the action falls short of its declared length.
pub fn process_file(
    input: &Path,
    output: &Path,
    action: &mut dyn Action,
    config: &CacheConfig,
) -> Result<u64> {
    if output.exists() {
        return Err(WskError::InvalidArgument(format!(
            "output file {} already exists",
            output.display()
        )));
    }
    let started = Instant::now();
    let mut reader = open_input(input, config)?;
    log::info!(
        "Input {}: {} frames, {}",
        input.display(),
        reader.frame_count(),
        reader.format()
    );

    let expected = action.expected_sample_count(&mut reader)?;
    log::info!("Action {} will write {} frames", action.name(), expected);

    let file = File::create(output)
        .map_err(|e| WskError::IoError(format!("{}: {}", output.display(), e)))?;
    let format = *reader.format();
    let mut sink = WavSink::new(BufWriter::new(file), &format, expected)?;
    action.execute(&mut reader, &mut sink)?;

    let written = sink.frames_written();
    if written < expected {
        log::warn!(
            "Action {} wrote {} frames instead of {}; padding with silence",
            action.name(),
            written,
            expected
        );
        sink.push_silence(expected - written)?;
    } else if written > expected {
        log::warn!(
            "Action {} wrote {} frames but declared {}; the header is wrong",
            action.name(),
            written,
            expected
        );
    }
    sink.finalize()?;
    log::info!("Done in {:.2}s", started.elapsed().as_secs_f64());
    Ok(written)
}

/// Copies frames `[first, last]` unchanged.
pub(crate) fn copy_frames(
    input: &mut InputReader,
    sink: &mut dyn OutputSink,
    first: SampleIndex,
    last: SampleIndex,
) -> Result<()> {
    if first > last {
        return Ok(());
    }
    input.raw_mut().for_each_range(first, last, 0, |_, bytes| {
        sink.push_raw(bytes)?;
        Ok(Flow::Continue)
    })?;
    Ok(())
}

/// Opens a secondary input and checks it shares `format` with the main one.
pub(crate) fn open_matching(path: &Path, format: &WavFormat) -> Result<InputReader> {
    let reader = open_input(path, &CacheConfig::new())?;
    if reader.format() != format {
        return Err(WskError::InvalidFormat(format!(
            "{} is {}, main input is {}",
            path.display(),
            reader.format(),
            format
        )));
    }
    Ok(reader)
}

/// Walks frames `[0, frames)` of several same-format inputs in lockstep.
///
/// `combine` gets each chunk's first frame and one value buffer per input,
/// all of the same length; inputs that ended early are padded with zeros.
pub(crate) fn for_each_aligned_chunk<F>(
    inputs: &mut [&mut InputReader],
    frames: u64,
    mut combine: F,
) -> Result<()>
where
    F: FnMut(SampleIndex, &[Vec<i32>]) -> Result<()>,
{
    let mut chunks = vec![Vec::new(); inputs.len()];
    let mut first = 0;
    while first < frames {
        let count = ALIGNED_CHUNK_FRAMES.min(frames - first);
        for (input, chunk) in inputs.iter_mut().zip(chunks.iter_mut()) {
            chunk.clear();
            let total = input.frame_count();
            if first < total {
                let last = (first + count - 1).min(total - 1);
                chunk.extend_from_slice(input.read(first, last, 0)?);
            }
            chunk.resize(count as usize * input.channels(), 0);
        }
        combine(first, &chunks)?;
        first += count;
    }
    Ok(())
}

/// Saturates computed values to the stream's bit depth and counts the clipped ones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clipper {
    min: i64,
    max: i64,
    clipped: u64,
}

impl Clipper {
    pub(crate) fn new(format: &WavFormat) -> Self {
        let (min, max) = format.value_range();
        Self {
            min,
            max,
            clipped: 0,
        }
    }

    #[inline]
    pub(crate) fn clip(&mut self, value: i64) -> i32 {
        if value < self.min || value > self.max {
            self.clipped += 1;
        }
        value.clamp(self.min, self.max) as i32
    }

    /// Logs how many values were saturated, if any.
    pub(crate) fn report(&self, action: &str) {
        if self.clipped > 0 {
            log::warn!(
                "{}: {} values exceeded [{}, {}] and were clipped",
                action,
                self.clipped,
                self.min,
                self.max
            );
        }
    }
}
