use super::{Action, Clipper};
use crate::cache::window::Flow;
use crate::cache::InputReader;
use crate::error::{Result, WskError};
use crate::io::sink::OutputSink;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "dc-shifter", about = "Add a constant offset to every value")]
pub struct DcShifterArgs {
    /// Offset for all channels, or one per channel joined by `|` (`34|35`).
    #[arg(long, default_value = "0")]
    pub offset: String,
}

/// Shifts the DC level of each channel.
#[derive(Debug, Clone)]
pub struct DcShifter {
    args: DcShifterArgs,
}

impl DcShifter {
    pub fn new(args: DcShifterArgs) -> Self {
        Self { args }
    }
}

/// One offset per channel from `N` or `N1|N2|...`.
fn parse_offsets(text: &str, channels: usize) -> Result<Vec<i64>> {
    let offsets = text
        .split('|')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|_| {
                WskError::InvalidArgument(format!("invalid offset '{}'", part))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    match offsets.len() {
        1 => Ok(vec![offsets[0]; channels]),
        n if n == channels => Ok(offsets),
        n => Err(WskError::InvalidArgument(format!(
            "{} offsets given for {} channels",
            n, channels
        ))),
    }
}

impl Action for DcShifter {
    fn name(&self) -> &'static str {
        "dc-shifter"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        parse_offsets(&self.args.offset, input.channels())?;
        Ok(input.frame_count())
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let channels = input.channels();
        let offsets = parse_offsets(&self.args.offset, channels)?;
        let total = input.frame_count();
        if total == 0 {
            return Ok(());
        }
        log::info!("Shifting channels by {:?}", offsets);

        let mut clipper = Clipper::new(input.format());
        let mut shifted = Vec::new();
        input.for_each_range(0, total - 1, 0, |_, values| {
            shifted.clear();
            for frame in values.chunks_exact(channels) {
                shifted.extend(
                    frame
                        .iter()
                        .zip(&offsets)
                        .map(|(&v, &offset)| clipper.clip(v as i64 + offset)),
                );
            }
            sink.push_frames(&shifted)?;
            Ok(Flow::Continue)
        })?;
        clipper.report(self.name());
        Ok(())
    }
}
