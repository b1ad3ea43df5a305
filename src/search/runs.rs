//! Enumeration of non-silent runs across a whole stream.

use super::engine::{BoundarySearchEngine, SearchRequest, SearchResult};
use crate::cache::decoded::DecodedSampleReader;
use crate::core::types::{Direction, SampleIndex, ThresholdSpec};
use crate::error::Result;
use crate::spectral::noise::NoiseProfile;
use std::io::{Read, Seek};

/// Inclusive frame range holding signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonSilentRun {
    pub first: SampleIndex,
    pub last: SampleIndex,
}

impl NonSilentRun {
    pub fn new(first: SampleIndex, last: SampleIndex) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// What to enumerate.
#[derive(Debug, Clone, Copy)]
pub struct RunQuery<'a> {
    pub start: SampleIndex,
    pub direction: Direction,
    pub thresholds: &'a ThresholdSpec,
    pub reference: Option<&'a NoiseProfile>,
    /// Shortest silence that separates two runs.
    pub min_silence: u64,
}

impl<'a> RunQuery<'a> {
    pub fn new(thresholds: &'a ThresholdSpec, min_silence: u64) -> Self {
        Self {
            start: 0,
            direction: Direction::Forward,
            thresholds,
            reference: None,
            min_silence,
        }
    }

    pub fn with_start(mut self, start: SampleIndex) -> Self {
        self.start = start;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_reference(mut self, reference: Option<&'a NoiseProfile>) -> Self {
        self.reference = reference;
        self
    }
}

/// Iterator over the non-silent runs of a stream, in scan order.
///
/// Each item alternates a signal search and a silence search; a search
/// interrupted by a loud frame is restarted from that frame.
pub struct NonSilentRuns<'e, 'r, 'q, R: Read + Seek> {
    engine: &'e mut BoundarySearchEngine,
    reader: &'r mut DecodedSampleReader<R>,
    query: RunQuery<'q>,
    cursor: SampleIndex,
    done: bool,
}

impl<'e, 'r, 'q, R: Read + Seek> NonSilentRuns<'e, 'r, 'q, R> {
    pub fn new(
        engine: &'e mut BoundarySearchEngine,
        reader: &'r mut DecodedSampleReader<R>,
        query: RunQuery<'q>,
    ) -> Self {
        Self {
            engine,
            reader,
            cursor: query.start,
            query,
            done: false,
        }
    }

    fn next_run(&mut self) -> Result<Option<NonSilentRun>> {
        let dir = self.query.direction;
        let thresholds = self.query.thresholds;
        let reference = self.query.reference;

        let signal_start = loop {
            let request = SearchRequest::signal(self.cursor, thresholds)
                .with_direction(dir)
                .with_reference(reference);
            match self.engine.find_boundary(self.reader, &request)? {
                SearchResult::Found(at) => break at,
                SearchResult::InterruptedByThreshold(at) => self.cursor = at,
                SearchResult::LimitReached => return Ok(None),
            }
        };

        // Silence can only start after the first loud frame
        let loud = SearchRequest::signal(signal_start, thresholds).with_direction(dir);
        let mut from = match self.engine.find_boundary(self.reader, &loud)? {
            SearchResult::Found(at) => at,
            _ => signal_start,
        };

        loop {
            let request = SearchRequest::silence(from, thresholds, self.query.min_silence)
                .with_direction(dir)
                .with_reference(reference);
            match self.engine.find_boundary(self.reader, &request)? {
                SearchResult::Found(silence) => {
                    self.cursor = silence;
                    let run = match dir {
                        Direction::Forward => NonSilentRun::new(signal_start, silence - 1),
                        Direction::Backward => NonSilentRun::new(silence + 1, signal_start),
                    };
                    return Ok(Some(run));
                }
                SearchResult::InterruptedByThreshold(at) => from = at,
                SearchResult::LimitReached => {
                    self.done = true;
                    let run = match dir {
                        Direction::Forward => {
                            NonSilentRun::new(signal_start, self.reader.frame_count() - 1)
                        }
                        Direction::Backward => NonSilentRun::new(0, signal_start),
                    };
                    return Ok(Some(run));
                }
            }
        }
    }
}

impl<R: Read + Seek> Iterator for NonSilentRuns<'_, '_, '_, R> {
    type Item = Result<NonSilentRun>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_run() {
            Ok(Some(run)) => {
                log::debug!("non-silent run [{}, {}]", run.first, run.last);
                Some(Ok(run))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Collects every non-silent run of `reader` matching `query`.
pub fn find_non_silent_runs<R: Read + Seek>(
    engine: &mut BoundarySearchEngine,
    reader: &mut DecodedSampleReader<R>,
    query: RunQuery<'_>,
) -> Result<Vec<NonSilentRun>> {
    NonSilentRuns::new(engine, reader, query).collect()
}

/// Merges forward-ordered runs separated by at most `max_gap` frames.
pub fn merge_short_gaps(runs: &[NonSilentRun], max_gap: u64) -> Vec<NonSilentRun> {
    let mut merged: Vec<NonSilentRun> = Vec::with_capacity(runs.len());
    for &run in runs {
        match merged.last_mut() {
            Some(prev) if run.first.saturating_sub(prev.last + 1) <= max_gap => {
                prev.last = prev.last.max(run.last);
            }
            _ => merged.push(run),
        }
    }
    merged
}
