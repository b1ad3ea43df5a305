use super::Action;
use crate::cache::InputReader;
use crate::core::params::SearchParams;
use crate::error::Result;
use crate::io::sink::OutputSink;
use crate::spectral::noise::NoiseProfile;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fft", about = "Compute the noise profile of the input")]
pub struct FftArgs {
    /// Where to store the profile.
    #[arg(long, default_value = "fft.result")]
    pub profile: PathBuf,
}

/// Profiles a noise recording for later silence searches. Writes no frames.
#[derive(Debug, Clone)]
pub struct Fft {
    args: FftArgs,
    params: SearchParams,
}

impl Fft {
    pub fn new(args: FftArgs, params: SearchParams) -> Self {
        Self { args, params }
    }
}

impl Action for Fft {
    fn name(&self) -> &'static str {
        "fft"
    }

    fn expected_sample_count(&mut self, _input: &mut InputReader) -> Result<u64> {
        Ok(0)
    }

    fn execute(&mut self, input: &mut InputReader, _sink: &mut dyn OutputSink) -> Result<()> {
        let profile = NoiseProfile::analyze(input.raw_mut(), &self.params)?;
        profile.save(&self.args.profile)?;
        log::info!(
            "Noise profile saved to {} (average distance {})",
            self.args.profile.display(),
            profile.average_distance
        );
        Ok(())
    }
}
