//! Option value types shared by several actions.

use crate::core::types::WavFormat;
use crate::error::{Result, WskError};
use crate::spectral::noise::NoiseProfile;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A length given either in frames (`234`) or in seconds (`25.3s`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    Frames(u64),
    Seconds(f64),
}

impl Default for Duration {
    fn default() -> Self {
        Duration::Frames(0)
    }
}

impl Duration {
    /// Number of frames at the stream's sample rate, rounded to nearest.
    pub fn to_frames(&self, format: &WavFormat) -> u64 {
        match *self {
            Duration::Frames(n) => n,
            Duration::Seconds(s) => format.frames_for_seconds(s),
        }
    }
}

impl FromStr for Duration {
    type Err = WskError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let bad = || WskError::InvalidArgument(format!("invalid duration '{}'", s));
        match s.strip_suffix('s') {
            Some(secs) => {
                let v: f64 = secs.parse().map_err(|_| bad())?;
                if !v.is_finite() || v < 0.0 {
                    return Err(bad());
                }
                Ok(Duration::Seconds(v))
            }
            None => s.parse().map(Duration::Frames).map_err(|_| bad()),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duration::Frames(n) => write!(f, "{}", n),
            Duration::Seconds(s) => write!(f, "{}s", s),
        }
    }
}

/// Loads the reference profile named by a `--noisefft` option.
///
/// `none` disables spectral refinement.
pub fn load_reference(path: Option<&Path>) -> Result<Option<NoiseProfile>> {
    match path {
        None => Ok(None),
        Some(p) if p.as_os_str() == "none" => Ok(None),
        Some(p) => NoiseProfile::load(p).map(Some),
    }
}
