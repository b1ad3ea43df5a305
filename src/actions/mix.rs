use super::{for_each_aligned_chunk, open_matching, Action, Clipper};
use crate::cache::InputReader;
use crate::error::{Result, WskError};
use crate::io::sink::OutputSink;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "mix", about = "Sum the input with other files")]
pub struct MixArgs {
    /// Files and their coefficients joined by `|` (`a.wav|1|b.wav|-0.4`).
    /// The input itself counts with coefficient 1.
    #[arg(long)]
    pub files: String,
}

/// Weighted sum of same-format files, as long as the longest of them.
#[derive(Debug, Clone)]
pub struct Mix {
    args: MixArgs,
}

impl Mix {
    pub fn new(args: MixArgs) -> Self {
        Self { args }
    }
}

/// Parses `file|coeff|file|coeff...`, dropping files with a null coefficient.
fn parse_mix_list(text: &str) -> Result<Vec<(PathBuf, f64)>> {
    let parts: Vec<&str> = text.split('|').collect();
    if parts.len() % 2 != 0 {
        return Err(WskError::InvalidArgument(format!(
            "invalid mix list '{}' (example: File1.wav|1|File2.wav|0.4)",
            text
        )));
    }
    let mut files = Vec::with_capacity(parts.len() / 2);
    for pair in parts.chunks_exact(2) {
        let coeff: f64 = pair[1].trim().parse().map_err(|_| {
            WskError::InvalidArgument(format!("invalid coefficient '{}' for {}", pair[1], pair[0]))
        })?;
        if coeff == 0.0 {
            log::warn!("{} has a null coefficient and is left out of the mix", pair[0]);
            continue;
        }
        files.push((PathBuf::from(pair[0]), coeff));
    }
    Ok(files)
}

impl Action for Mix {
    fn name(&self) -> &'static str {
        "mix"
    }

    fn expected_sample_count(&mut self, input: &mut InputReader) -> Result<u64> {
        let mut frames = input.frame_count();
        for (path, _) in parse_mix_list(&self.args.files)? {
            frames = frames.max(open_matching(&path, input.format())?.frame_count());
        }
        Ok(frames)
    }

    fn execute(&mut self, input: &mut InputReader, sink: &mut dyn OutputSink) -> Result<()> {
        let format = *input.format();
        let mut coeffs = vec![1.0];
        let mut others = Vec::new();
        for (path, coeff) in parse_mix_list(&self.args.files)? {
            others.push(open_matching(&path, &format)?);
            coeffs.push(coeff);
        }
        let frames = others
            .iter()
            .map(|r| r.frame_count())
            .fold(input.frame_count(), u64::max);
        log::info!("Mixing {} files over {} frames", coeffs.len(), frames);

        let mut inputs: Vec<&mut InputReader> = Vec::with_capacity(coeffs.len());
        inputs.push(input);
        inputs.extend(others.iter_mut());

        let mut clipper = Clipper::new(&format);
        let mut mixed = Vec::new();
        for_each_aligned_chunk(&mut inputs, frames, |_, chunks| {
            mixed.clear();
            mixed.resize(chunks[0].len(), 0.0f64);
            for (chunk, &coeff) in chunks.iter().zip(&coeffs) {
                for (acc, &v) in mixed.iter_mut().zip(chunk) {
                    *acc += v as f64 * coeff;
                }
            }
            let values: Vec<i32> = mixed.iter().map(|&m| clipper.clip(m.round() as i64)).collect();
            sink.push_frames(&values)
        })?;
        clipper.report(self.name());
        Ok(())
    }
}
