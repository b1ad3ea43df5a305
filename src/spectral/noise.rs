//! Reference noise profiles persisted between runs.

use super::profile::{SpectralProfile, SpectralProfiler};
use crate::cache::raw::RawSampleReader;
use crate::cache::window::Flow;
use crate::core::params::SearchParams;
use crate::error::{Result, WskError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

/// Slack added to a loaded average distance before it is used as a limit.
pub const LOADED_DISTANCE_TOLERANCE: f64 = 1.01;

/// Spectral fingerprint of a noise recording and how far its probes stray from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Mean distance of every probe window of the recording to `profile`.
    pub average_distance: i64,
    /// Whole-recording profile.
    pub profile: SpectralProfile,
}

impl NoiseProfile {
    /// Profiles the whole stream, then averages the distance of each probe window to it.
    pub fn analyze<R: Read + Seek>(
        reader: &mut RawSampleReader<R>,
        params: &SearchParams,
    ) -> Result<Self> {
        let format = *reader.format();
        let total = reader.frame_count();
        if total == 0 {
            return Err(WskError::Profile(
                "cannot profile an empty stream".to_string(),
            ));
        }
        let probe = params.probe_frames(format.sample_rate);
        let mut profiler = SpectralProfiler::new(format.sample_rate, probe);

        log::info!("Creating spectral profile over {} frames ...", total);
        let mut acc = profiler.begin(&format)?;
        reader.for_each_range(0, total - 1, 0, |_, bytes| {
            profiler.accumulate(&mut acc, bytes);
            Ok(Flow::Continue)
        })?;
        let profile = profiler.finish(&acc);

        log::info!("Computing average probe distance ...");
        let mut sum: i128 = 0;
        let mut probes: i128 = 0;
        let mut first = 0u64;
        while first < total {
            let last = (first + probe - 1).min(total - 1);
            let frames = last - first + 1;
            let bytes = reader.read(first, last, total - first)?;
            let p = profiler.compute_profile(bytes, &format, frames)?;
            sum += profiler.distance(&profile, &p) as i128;
            probes += 1;
            first = last + 1;
        }
        let average_distance = (sum / probes) as i64;
        log::debug!("Average distance with silence: {}", average_distance);

        Ok(Self {
            average_distance,
            profile,
        })
    }

    /// Distance limit a search should use with this reference.
    pub fn max_distance(&self) -> i64 {
        (self.average_distance as f64 * LOADED_DISTANCE_TOLERANCE) as i64
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| WskError::Profile(format!("{}: {}", path.display(), e)))?;
        let profile: NoiseProfile = serde_json::from_reader(BufReader::new(file))?;
        log::debug!(
            "loaded noise profile {} (average distance {})",
            path.display(),
            profile.average_distance
        );
        Ok(profile)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| WskError::Profile(format!("{}: {}", path.display(), e)))?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::CacheConfig;
    use crate::core::types::WavFormat;
    use crate::io::wav::write_wav;
    use std::io::Cursor;

    fn noise(n: usize, amp: i32, seed: u32) -> Vec<i32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) % (2 * amp as u32 + 1)) as i32 - amp
            })
            .collect()
    }

    #[test]
    fn test_analyze_noise() {
        let format = WavFormat::pcm(1, 8000, 16);
        let bytes = write_wav(&format, &noise(8000, 40, 7)).unwrap();
        let mut reader = RawSampleReader::open(Cursor::new(bytes), &CacheConfig::new()).unwrap();
        let profile = NoiseProfile::analyze(&mut reader, &SearchParams::new()).unwrap();
        assert_eq!(profile.profile.sample_count, 8000);
        assert_eq!(profile.profile.magnitudes.len(), 139);
        assert!(profile.average_distance > 0);
        assert!(profile.max_distance() >= profile.average_distance);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fft.result");
        let profile = NoiseProfile {
            average_distance: 123_456_789,
            profile: SpectralProfile {
                bits_per_sample: 16,
                sample_count: 800,
                magnitudes: vec![vec![5, 6]; 139],
            },
        };
        profile.save(&path).unwrap();
        assert_eq!(NoiseProfile::load(&path).unwrap(), profile);
    }

    #[test]
    fn test_load_garbage_is_profile_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(NoiseProfile::load(&path), Err(WskError::Profile(_))));
        assert!(matches!(
            NoiseProfile::load(&dir.path().join("missing")),
            Err(WskError::Profile(_))
        ));
    }
}
