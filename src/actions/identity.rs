use super::{copy_frames, Action};
use crate::cache::InputReader;
use crate::error::Result;
use crate::io::sink::OutputSink;

/// Copies the input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Action for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        Ok(input.frame_count())
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let total = input.frame_count();
        if total > 0 {
            copy_frames(input, sink, 0, total - 1)?;
        }
        Ok(())
    }
}
