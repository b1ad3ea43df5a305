use super::{for_each_aligned_chunk, open_matching, Action, Clipper};
use crate::cache::InputReader;
use crate::error::{Result, WskError};
use crate::io::sink::OutputSink;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "compare", about = "Write (input - inputfile2) * coeff")]
pub struct CompareArgs {
    /// File subtracted from the input; it must share the input's format.
    #[arg(long = "inputfile2")]
    pub input_file2: PathBuf,
    /// Multiplies every difference.
    #[arg(long, default_value_t = 1)]
    pub coeff: i32,
}

/// Writes the scaled difference of two files. The shorter one reads as silence past its end.
#[derive(Debug, Clone)]
pub struct Compare {
    args: CompareArgs,
}

impl Compare {
    pub fn new(args: CompareArgs) -> Self {
        Self { args }
    }

    fn open_other(&self, input: &InputReader) -> Result<InputReader> {
        if self.args.coeff == 0 {
            return Err(WskError::InvalidArgument("--coeff must not be 0".into()));
        }
        open_matching(&self.args.input_file2, input.format())
    }
}

impl Action for Compare {
    fn name(&self) -> &'static str {
        "compare"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        let other = self.open_other(input)?;
        let (ours, theirs) = (input.frame_count(), other.frame_count());
        if theirs != ours {
            log::warn!(
                "{} has {} frames, input has {}",
                self.args.input_file2.display(),
                theirs,
                ours
            );
        }
        Ok(ours.max(theirs))
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let mut other = self.open_other(input)?;
        let frames = input.frame_count().max(other.frame_count());
        let format = *input.format();
        let coeff = self.args.coeff as i64;

        let mut clipper = Clipper::new(&format);
        let mut cumulative: u128 = 0;
        let mut diff = Vec::new();
        for_each_aligned_chunk(&mut [input, &mut other], frames, |_, chunks| {
            diff.clear();
            diff.extend(chunks[0].iter().zip(&chunks[1]).map(|(&a, &b)| {
                let d = clipper.clip((a as i64 - b as i64) * coeff);
                cumulative += d.unsigned_abs() as u128;
                d
            }));
            sink.push_frames(&diff)
        })?;
        clipper.report(self.name());

        let normalized = cumulative / coeff.unsigned_abs() as u128;
        let full_scale = frames as f64 * format.channels as f64 * 2f64.powi(format.bits_per_sample as i32);
        let percent = if full_scale > 0.0 {
            normalized as f64 * 100.0 / full_scale
        } else {
            0.0
        };
        log::info!("Cumulative errors: {} ({} %)", normalized, percent);
        Ok(())
    }
}
