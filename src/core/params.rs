use crate::error::{Result, WskError};

/// Default raw window: 8 MiB of file bytes.
pub const DEFAULT_RAW_WINDOW_BYTES: usize = 8 * 1024 * 1024;
/// Default decoded window: 2 Mi channel values.
pub const DEFAULT_DECODED_WINDOW_VALUES: usize = 2 * 1024 * 1024;

/// Window sizes for the two cache levels of a sample reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum bytes held by the raw window (default: 8 MiB).
    pub raw_window_bytes: usize,
    /// Maximum channel values held by the decoded window (default: 2 Mi).
    pub decoded_window_values: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self {
            raw_window_bytes: DEFAULT_RAW_WINDOW_BYTES,
            decoded_window_values: DEFAULT_DECODED_WINDOW_VALUES,
        }
    }

    /// Set the raw window size in bytes.
    pub fn with_raw_window_bytes(mut self, bytes: usize) -> Self {
        self.raw_window_bytes = bytes;
        self
    }

    /// Set the decoded window size in channel values.
    pub fn with_decoded_window_values(mut self, values: usize) -> Self {
        self.decoded_window_values = values;
        self
    }

    /// Raw window length in frames for `block_align`-byte frames, at least 1.
    pub fn raw_window_frames(&self, block_align: usize) -> u64 {
        (self.raw_window_bytes / block_align.max(1)).max(1) as u64
    }

    /// Decoded window length in frames for `channels` values per frame, at least 1.
    pub fn decoded_window_frames(&self, channels: u16) -> u64 {
        (self.decoded_window_values / channels.max(1) as usize).max(1) as u64
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<()> {
        if self.raw_window_bytes == 0 || self.decoded_window_values == 0 {
            return Err(WskError::InvalidArgument(
                "cache windows must hold at least one frame".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tuning of the spectral refinement phase of a boundary search.
///
/// The tolerance percentages were tuned by ear on real recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Probes per second of audio; a probe spans `sample_rate / probe_frequency` frames (default: 10).
    pub probe_frequency: u32,
    /// Number of probe distances tracked for the convergence test (default: 5).
    pub history_len: usize,
    /// Probes read ahead per raw cache fill (default: 30).
    pub prefetch_probes: u64,
    /// Allowed excess of the history sum over `history_len * max_distance`, in percent (default: 0).
    pub average_tolerance_pct: f64,
    /// Allowed excess of any single history entry over `max_distance`, in percent (default: 20).
    pub max_tolerance_pct: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchParams {
    pub fn new() -> Self {
        Self {
            probe_frequency: 10,
            history_len: 5,
            prefetch_probes: 30,
            average_tolerance_pct: 0.0,
            max_tolerance_pct: 20.0,
        }
    }

    /// Set the probe frequency in probes per second.
    pub fn with_probe_frequency(mut self, hz: u32) -> Self {
        self.probe_frequency = hz;
        self
    }

    /// Set the history length.
    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history_len = len;
        self
    }

    /// Set the number of probes fetched per cache fill.
    pub fn with_prefetch_probes(mut self, probes: u64) -> Self {
        self.prefetch_probes = probes;
        self
    }

    /// Set both tolerance percentages.
    pub fn with_tolerances(mut self, average_pct: f64, max_pct: f64) -> Self {
        self.average_tolerance_pct = average_pct;
        self.max_tolerance_pct = max_pct;
        self
    }

    /// Frames in one probe window at `sample_rate`.
    pub fn probe_frames(&self, sample_rate: u32) -> u64 {
        (sample_rate / self.probe_frequency.max(1)).max(1) as u64
    }

    /// Upper bound on the history sum for a reference distance of `max_distance`.
    pub fn sum_limit(&self, max_distance: i64) -> i64 {
        (max_distance as f64
            * self.history_len as f64
            * (1.0 + self.average_tolerance_pct / 100.0))
            .round() as i64
    }

    /// Upper bound on any single history entry.
    pub fn entry_limit(&self, max_distance: i64) -> i64 {
        (max_distance as f64 * (1.0 + self.max_tolerance_pct / 100.0)).round() as i64
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<()> {
        if self.probe_frequency == 0 {
            return Err(WskError::InvalidArgument(
                "probe frequency must be positive".to_string(),
            ));
        }
        if self.history_len == 0 {
            return Err(WskError::InvalidArgument(
                "history length must be positive".to_string(),
            ));
        }
        if !self.average_tolerance_pct.is_finite()
            || !self.max_tolerance_pct.is_finite()
            || self.average_tolerance_pct < 0.0
            || self.max_tolerance_pct < 0.0
        {
            return Err(WskError::InvalidArgument(
                "tolerances must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let cfg = CacheConfig::new();
        assert_eq!(cfg.raw_window_frames(4), 2 * 1024 * 1024);
        assert_eq!(cfg.decoded_window_frames(2), 1024 * 1024);
        assert!(cfg.validate().is_ok());
        assert!(cfg.with_raw_window_bytes(0).validate().is_err());
    }

    #[test]
    fn test_window_frames_never_zero() {
        let cfg = CacheConfig::new()
            .with_raw_window_bytes(3)
            .with_decoded_window_values(1);
        assert_eq!(cfg.raw_window_frames(6), 1);
        assert_eq!(cfg.decoded_window_frames(2), 1);
    }

    #[test]
    fn test_search_params_limits() {
        let params = SearchParams::new();
        assert_eq!(params.probe_frames(44100), 4410);
        assert_eq!(params.sum_limit(1000), 5000);
        assert_eq!(params.entry_limit(1000), 1200);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_search_params_validate() {
        assert!(SearchParams::new().with_history_len(0).validate().is_err());
        assert!(SearchParams::new().with_probe_frequency(0).validate().is_err());
        assert!(SearchParams::new()
            .with_tolerances(f64::NAN, 1.0)
            .validate()
            .is_err());
    }
}
