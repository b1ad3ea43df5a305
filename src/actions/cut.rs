use super::options::Duration;
use super::{copy_frames, Action};
use crate::cache::InputReader;
use crate::core::types::SampleIndex;
use crate::error::{Result, WskError};
use crate::io::sink::OutputSink;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "cut", about = "Keep the frames between two positions (inclusive)")]
pub struct CutArgs {
    /// First kept position, in frames or seconds (`12.5s`).
    #[arg(long)]
    pub begin: Duration,
    /// Last kept position, clamped to the end of the input.
    #[arg(long)]
    pub end: Duration,
}

/// Extracts a frame range.
#[derive(Debug, Clone)]
pub struct Cut {
    args: CutArgs,
}

impl Cut {
    pub fn new(args: CutArgs) -> Self {
        Self { args }
    }

    fn range(&self, input: &InputReader) -> Result<(SampleIndex, SampleIndex)> {
        let total = input.frame_count();
        let begin = self.args.begin.to_frames(input.format());
        let end = self.args.end.to_frames(input.format());
        if total == 0 || begin > end || begin >= total {
            return Err(WskError::InvalidArgument(format!(
                "cannot cut [{}, {}] from {} frames",
                self.args.begin, self.args.end, total
            )));
        }
        Ok((begin, end.min(total - 1)))
    }
}

impl Action for Cut {
    fn name(&self) -> &'static str {
        "cut"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        let (begin, end) = self.range(input)?;
        Ok(end - begin + 1)
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let (begin, end) = self.range(input)?;
        log::info!("Cutting frames [{}, {}]", begin, end);
        copy_frames(input, sink, begin, end)
    }
}
