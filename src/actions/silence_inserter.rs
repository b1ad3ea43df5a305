use super::options::Duration;
use super::{copy_frames, Action};
use crate::cache::InputReader;
use crate::error::Result;
use crate::io::sink::OutputSink;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "silence-inserter", about = "Pad the input with digital silence")]
pub struct SilenceInserterArgs {
    /// Silence written before the input, in frames or seconds.
    #[arg(long, default_value = "0")]
    pub begin: Duration,
    /// Silence written after the input.
    #[arg(long, default_value = "0")]
    pub end: Duration,
}

/// Surrounds the input with silence.
#[derive(Debug, Clone)]
pub struct SilenceInserter {
    args: SilenceInserterArgs,
}

impl SilenceInserter {
    pub fn new(args: SilenceInserterArgs) -> Self {
        Self { args }
    }
}

impl Action for SilenceInserter {
    fn name(&self) -> &'static str {
        "silence-inserter"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        let format = input.format();
        Ok(self.args.begin.to_frames(format) + input.frame_count() + self.args.end.to_frames(format))
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let format = *input.format();
        let begin = self.args.begin.to_frames(&format);
        let end = self.args.end.to_frames(&format);
        log::info!("Inserting {} frames of silence before and {} after", begin, end);

        sink.push_silence(begin)?;
        let total = input.frame_count();
        if total > 0 {
            copy_frames(input, sink, 0, total - 1)?;
        }
        sink.push_silence(end)
    }
}
