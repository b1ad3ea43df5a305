//! Two-phase silence/signal boundary search.
//!
//! Phase 1 scans decoded frames against a [`ThresholdSpec`]. When a reference
//! [`NoiseProfile`] is supplied, phase 2 refines the candidate by profiling
//! fixed-duration probe windows and tracking their distance to the reference
//! until the trend turns away from it.

use super::history::{ProbeDistance, SearchHistory};
use crate::cache::decoded::DecodedSampleReader;
use crate::cache::window::Flow;
use crate::core::params::SearchParams;
use crate::core::types::{Direction, SampleIndex, ThresholdSpec, WavFormat};
use crate::error::{Result, WskError};
use crate::spectral::noise::NoiseProfile;
use crate::spectral::profile::SpectralProfiler;
use std::io::{Read, Seek};

/// Outcome of one boundary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(SampleIndex),
    /// A frame broke the thresholds while probing; scan again from it.
    InterruptedByThreshold(SampleIndex),
    LimitReached,
}

/// What the search is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// First frame outside the thresholds.
    Signal,
    /// First frame of a run of at least `min_frames` silent frames.
    Silence { min_frames: u64 },
}

/// Where the engine stands in its last search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Scanning,
    Converging,
    Interrupted,
    Found,
    LimitReached,
}

/// Parameters of a single boundary search.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub start: SampleIndex,
    pub direction: Direction,
    pub target: Target,
    pub thresholds: &'a ThresholdSpec,
    pub reference: Option<&'a NoiseProfile>,
    /// Last frame the search may inspect; defaults to the stream end in `direction`.
    pub limit: Option<SampleIndex>,
}

impl<'a> SearchRequest<'a> {
    /// Forward search for the first non-silent frame.
    pub fn signal(start: SampleIndex, thresholds: &'a ThresholdSpec) -> Self {
        Self {
            start,
            direction: Direction::Forward,
            target: Target::Signal,
            thresholds,
            reference: None,
            limit: None,
        }
    }

    /// Forward search for the first silence of at least `min_frames` frames.
    pub fn silence(start: SampleIndex, thresholds: &'a ThresholdSpec, min_frames: u64) -> Self {
        Self {
            target: Target::Silence { min_frames },
            ..Self::signal(start, thresholds)
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_reference(mut self, reference: Option<&'a NoiseProfile>) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_limit(mut self, limit: SampleIndex) -> Self {
        self.limit = Some(limit);
        self
    }
}

enum ProbeOutcome {
    Converged(SampleIndex),
    Interrupted(SampleIndex),
    Exhausted,
}

/// Locates silence/signal boundaries in a decoded stream.
pub struct BoundarySearchEngine {
    params: SearchParams,
    format: WavFormat,
    profiler: Option<SpectralProfiler>,
    state: SearchState,
}

impl BoundarySearchEngine {
    pub fn new(format: &WavFormat, params: SearchParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            format: *format,
            profiler: None,
            state: SearchState::Scanning,
        })
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// State the last search ended in.
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Runs both phases of a boundary search.
    pub fn find_boundary<R: Read + Seek>(
        &mut self,
        reader: &mut DecodedSampleReader<R>,
        request: &SearchRequest<'_>,
    ) -> Result<SearchResult> {
        self.state = SearchState::Scanning;
        if *reader.format() != self.format {
            return Err(WskError::InvalidArgument(format!(
                "engine built for {:?}, stream is {:?}",
                self.format,
                reader.format()
            )));
        }
        let total = reader.frame_count();
        let dir = request.direction;
        let limit = match (dir, request.limit) {
            (_, _) if total == 0 => return Ok(self.finish(SearchResult::LimitReached)),
            (Direction::Forward, Some(l)) => l.min(total - 1),
            (Direction::Forward, None) => total - 1,
            (Direction::Backward, Some(l)) => l,
            (Direction::Backward, None) => 0,
        };
        if request.start >= total || !dir.within(request.start, limit) {
            return Ok(self.finish(SearchResult::LimitReached));
        }

        let candidate = match scan_candidate(reader, request, limit)? {
            Some(c) => c,
            None => return Ok(self.finish(SearchResult::LimitReached)),
        };
        log::debug!(
            "{:?} candidate at {} (from {}, {:?})",
            request.target,
            candidate,
            request.start,
            dir
        );

        let reference = match request.reference {
            Some(r) => r,
            None => return Ok(self.finish(SearchResult::Found(candidate))),
        };
        if reference.profile.channels() != reader.channels() {
            return Err(WskError::Profile(format!(
                "reference profile has {} channels, stream has {}",
                reference.profile.channels(),
                reader.channels()
            )));
        }

        let result = match request.target {
            Target::Silence { min_frames } => {
                self.refine_silence(reader, request, reference, candidate, limit, min_frames.max(1))?
            }
            // The silence confirmed behind the candidate ends where the signal begins.
            Target::Signal if candidate == request.start => SearchResult::Found(candidate),
            Target::Signal => {
                let back = dir.reverse();
                let from = back.advance(candidate, 1);
                match self.refine(reader, request.thresholds, reference, from, request.start, back)? {
                    ProbeOutcome::Converged(anchor) | ProbeOutcome::Interrupted(anchor) => {
                        SearchResult::Found(dir.advance(anchor, 1))
                    }
                    ProbeOutcome::Exhausted => SearchResult::Found(request.start),
                }
            }
        };
        Ok(self.finish(result))
    }

    /// Profiles one probe window of `format` frames held in `bytes`.
    ///
    /// Returns its distance to `reference`.
    pub fn probe_distance(
        &mut self,
        bytes: &[u8],
        frames: u64,
        reference: &NoiseProfile,
    ) -> Result<i64> {
        let format = self.format;
        let probe = self.params.probe_frames(format.sample_rate);
        let profiler = self
            .profiler
            .get_or_insert_with(|| SpectralProfiler::new(format.sample_rate, probe));
        let profile = profiler.compute_profile(bytes, &format, frames)?;
        Ok(profiler.distance(&reference.profile, &profile))
    }

    /// Refines a silence candidate, then checks the silence behind the
    /// converged anchor still spans `min_frames` before the next loud frame.
    /// A shorter silence restarts phase 1 from that loud frame.
    fn refine_silence<R: Read + Seek>(
        &mut self,
        reader: &mut DecodedSampleReader<R>,
        request: &SearchRequest<'_>,
        reference: &NoiseProfile,
        mut candidate: SampleIndex,
        limit: SampleIndex,
        min_frames: u64,
    ) -> Result<SearchResult> {
        let dir = request.direction;
        loop {
            let anchor =
                match self.refine(reader, request.thresholds, reference, candidate, limit, dir)? {
                    ProbeOutcome::Converged(anchor) => anchor,
                    ProbeOutcome::Interrupted(at) => {
                        return Ok(SearchResult::InterruptedByThreshold(at))
                    }
                    ProbeOutcome::Exhausted => return Ok(SearchResult::LimitReached),
                };

            let tail = SearchRequest {
                start: anchor,
                target: Target::Signal,
                ..*request
            };
            let next_loud = scan_candidate(reader, &tail, limit)?;
            let length = match next_loud {
                Some(loud) => dir.span(anchor, loud).saturating_sub(1),
                None => dir.span(anchor, limit),
            };
            if length >= min_frames {
                return Ok(SearchResult::Found(anchor));
            }
            let loud = match next_loud {
                Some(loud) => loud,
                None => return Ok(SearchResult::LimitReached),
            };
            log::debug!(
                "silence at {} lasts {} frames, less than {}; scanning again from {}",
                anchor,
                length,
                min_frames,
                loud
            );

            let rescan = SearchRequest {
                start: loud,
                ..*request
            };
            candidate = match scan_candidate(reader, &rescan, limit)? {
                Some(c) => c,
                None => return Ok(SearchResult::LimitReached),
            };
            self.state = SearchState::Scanning;
        }
    }

    fn refine<R: Read + Seek>(
        &mut self,
        reader: &mut DecodedSampleReader<R>,
        thresholds: &ThresholdSpec,
        reference: &NoiseProfile,
        from: SampleIndex,
        to: SampleIndex,
        dir: Direction,
    ) -> Result<ProbeOutcome> {
        self.state = SearchState::Converging;
        let probe = self.params.probe_frames(self.format.sample_rate);
        let prefetch = probe.saturating_mul(self.params.prefetch_probes);
        let max_distance = reference.max_distance();
        let sum_limit = self.params.sum_limit(max_distance);
        let entry_limit = self.params.entry_limit(max_distance);
        let mut history = SearchHistory::new(self.params.history_len);
        let channels = reader.channels();

        let mut cursor = from;
        while dir.within(cursor, to) {
            let frames = probe.min(dir.span(cursor, to));
            let (lo, hi) = match dir {
                Direction::Forward => (cursor, cursor + frames - 1),
                Direction::Backward => (cursor + 1 - frames, cursor),
            };

            let values = match dir {
                Direction::Forward => reader.read(lo, hi, prefetch)?,
                Direction::Backward => reader.read_back(lo, hi, prefetch)?,
            };
            if let Some(at) = first_loud(values, channels, lo, dir, thresholds) {
                log::debug!("probe at {} interrupted by frame {}", cursor, at);
                return Ok(ProbeOutcome::Interrupted(at));
            }

            let bytes = match dir {
                Direction::Forward => reader.raw_mut().read(lo, hi, prefetch)?,
                Direction::Backward => reader.raw_mut().read_back(lo, hi, prefetch)?,
            };
            let distance = self.probe_distance(bytes, frames, reference)?;
            log::debug!("probe at {}: distance {}", cursor, distance);

            if history.converged(distance, sum_limit, entry_limit) {
                if let Some(oldest) = history.oldest() {
                    return Ok(ProbeOutcome::Converged(oldest.anchor));
                }
            }
            history.push(ProbeDistance {
                distance,
                anchor: cursor,
            });

            let reached = match dir {
                Direction::Forward => hi >= to,
                Direction::Backward => lo <= to,
            };
            if reached {
                break;
            }
            cursor = dir.advance(cursor, frames);
        }
        Ok(ProbeOutcome::Exhausted)
    }

    fn finish(&mut self, result: SearchResult) -> SearchResult {
        self.state = match result {
            SearchResult::Found(_) => SearchState::Found,
            SearchResult::InterruptedByThreshold(_) => SearchState::Interrupted,
            SearchResult::LimitReached => SearchState::LimitReached,
        };
        result
    }
}

/// Phase 1: walks from `request.start` to `limit` looking for the target.
fn scan_candidate<R: Read + Seek>(
    reader: &mut DecodedSampleReader<R>,
    request: &SearchRequest<'_>,
    limit: SampleIndex,
) -> Result<Option<SampleIndex>> {
    let channels = reader.channels();
    let thresholds = request.thresholds;
    let min_run = match request.target {
        Target::Signal => 0,
        Target::Silence { min_frames } => min_frames.max(1),
    };
    let mut run_start = 0;
    let mut run_len = 0u64;

    let mut check = |idx: SampleIndex, frame: &[i32]| -> Flow {
        let silent = thresholds.is_silent(frame);
        if min_run == 0 {
            return if silent { Flow::Continue } else { Flow::StopAt(idx) };
        }
        if !silent {
            run_len = 0;
            return Flow::Continue;
        }
        if run_len == 0 {
            run_start = idx;
        }
        run_len += 1;
        if run_len >= min_run {
            Flow::StopAt(run_start)
        } else {
            Flow::Continue
        }
    };

    match request.direction {
        Direction::Forward => reader.for_each_range(request.start, limit, u64::MAX, |first, values| {
            for (k, frame) in values.chunks_exact(channels).enumerate() {
                if let Flow::StopAt(idx) = check(first + k as u64, frame) {
                    return Ok(Flow::StopAt(idx));
                }
            }
            Ok(Flow::Continue)
        }),
        Direction::Backward => {
            reader.for_each_range_reversed(limit, request.start, u64::MAX, |first, values| {
                for (k, frame) in values.chunks_exact(channels).enumerate().rev() {
                    if let Flow::StopAt(idx) = check(first + k as u64, frame) {
                        return Ok(Flow::StopAt(idx));
                    }
                }
                Ok(Flow::Continue)
            })
        }
    }
}

/// First frame in scan order of `values` (starting at frame `lo`) that breaks `thresholds`.
fn first_loud(
    values: &[i32],
    channels: usize,
    lo: SampleIndex,
    dir: Direction,
    thresholds: &ThresholdSpec,
) -> Option<SampleIndex> {
    let mut frames = values.chunks_exact(channels).enumerate();
    let hit = match dir {
        Direction::Forward => frames.find(|(_, f)| !thresholds.is_silent(f)),
        Direction::Backward => frames.rev().find(|(_, f)| !thresholds.is_silent(f)),
    };
    hit.map(|(k, _)| lo + k as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::CacheConfig;
    use crate::io::wav::write_wav;
    use crate::spectral::profile::SpectralProfile;
    use std::io::Cursor;

    fn mono_reader(sr: u32, samples: &[i32]) -> DecodedSampleReader<Cursor<Vec<u8>>> {
        let format = WavFormat::pcm(1, sr, 16);
        let bytes = write_wav(&format, samples).unwrap();
        DecodedSampleReader::open(Cursor::new(bytes), &CacheConfig::new()).unwrap()
    }

    fn engine(sr: u32) -> BoundarySearchEngine {
        BoundarySearchEngine::new(&WavFormat::pcm(1, sr, 16), SearchParams::new()).unwrap()
    }

    fn zero_reference() -> NoiseProfile {
        NoiseProfile {
            average_distance: crate::spectral::DISTANCE_SCALE,
            profile: SpectralProfile {
                bits_per_sample: 16,
                sample_count: 800,
                magnitudes: vec![vec![0]; 139],
            },
        }
    }

    #[test]
    fn test_signal_after_silence() {
        let mut samples = vec![0; 1000];
        samples.extend(std::iter::repeat(5000).take(500));
        let mut reader = mono_reader(44100, &samples);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let mut engine = engine(44100);
        let result = engine
            .find_boundary(&mut reader, &SearchRequest::signal(0, &thresholds))
            .unwrap();
        assert_eq!(result, SearchResult::Found(1000));
        assert_eq!(engine.state(), SearchState::Found);
    }

    #[test]
    fn test_backward_signal() {
        let mut samples = vec![3000; 400];
        samples.extend(std::iter::repeat(0).take(600));
        let mut reader = mono_reader(8000, &samples);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let request = SearchRequest::signal(999, &thresholds).with_direction(Direction::Backward);
        let result = engine(8000).find_boundary(&mut reader, &request).unwrap();
        assert_eq!(result, SearchResult::Found(399));
    }

    #[test]
    fn test_silence_needs_min_run() {
        // Loud, 5 silent, loud, 20 silent, loud
        let mut samples = vec![900; 10];
        samples.extend([0; 5]);
        samples.extend([900; 3]);
        samples.extend([0; 20]);
        samples.extend([900; 2]);
        let mut reader = mono_reader(8000, &samples);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let mut engine = engine(8000);
        let forward = SearchRequest::silence(0, &thresholds, 10);
        assert_eq!(
            engine.find_boundary(&mut reader, &forward).unwrap(),
            SearchResult::Found(18)
        );
        let backward = SearchRequest::silence(39, &thresholds, 10).with_direction(Direction::Backward);
        assert_eq!(
            engine.find_boundary(&mut reader, &backward).unwrap(),
            SearchResult::Found(37)
        );
        let too_long = SearchRequest::silence(0, &thresholds, 21);
        assert_eq!(
            engine.find_boundary(&mut reader, &too_long).unwrap(),
            SearchResult::LimitReached
        );
        assert_eq!(engine.state(), SearchState::LimitReached);
    }

    #[test]
    fn test_limit_stops_scan() {
        let mut samples = vec![0; 100];
        samples.push(700);
        let mut reader = mono_reader(8000, &samples);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let request = SearchRequest::signal(0, &thresholds).with_limit(99);
        assert_eq!(
            engine(8000).find_boundary(&mut reader, &request).unwrap(),
            SearchResult::LimitReached
        );
        let past_end = SearchRequest::signal(101, &thresholds);
        assert_eq!(
            engine(8000).find_boundary(&mut reader, &past_end).unwrap(),
            SearchResult::LimitReached
        );
    }

    #[test]
    fn test_reference_channel_mismatch() {
        let mut samples = vec![0; 10];
        samples.extend([5000; 10]);
        let mut reader = mono_reader(8000, &samples);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let mut reference = zero_reference();
        reference.profile.magnitudes = vec![vec![0, 0]; 139];
        let request = SearchRequest::signal(0, &thresholds).with_reference(Some(&reference));
        assert!(matches!(
            engine(8000).find_boundary(&mut reader, &request),
            Err(WskError::Profile(_))
        ));
    }

    #[test]
    fn test_stream_format_must_match_engine() {
        let mut reader = mono_reader(44100, &[0, 0, 5000]);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let mut engine = engine(8000);
        assert!(matches!(
            engine.find_boundary(&mut reader, &SearchRequest::signal(0, &thresholds)),
            Err(WskError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_signal_at_start_needs_no_refinement() {
        let mut reader = mono_reader(8000, &[5000; 50]);
        let thresholds = ThresholdSpec::symmetric(100, 1);
        let reference = zero_reference();
        let request = SearchRequest::signal(0, &thresholds).with_reference(Some(&reference));
        assert_eq!(
            engine(8000).find_boundary(&mut reader, &request).unwrap(),
            SearchResult::Found(0)
        );
    }
}
