#![forbid(unsafe_code)]
//! Streaming PCM WAV toolkit for locating silence and signal boundaries.
//!
//! `wavsk` reads arbitrarily large WAV files through bounded window caches,
//! finds where silence ends and signal begins with a per-channel amplitude
//! threshold, and optionally refines those boundaries by comparing the
//! spectrum of short probe windows against a recorded noise profile. A small
//! set of whole-file actions (trimming, gating, padding, mixing, level
//! analysis, noise profiling) is built on top and exposed through the `wavsk`
//! binary.
//!
//! # Quick Start
//!
//! ```
//! use std::io::Cursor;
//! use wavsk::{
//!     BoundarySearchEngine, CacheConfig, DecodedSampleReader, SearchParams, SearchRequest,
//!     SearchResult, ThresholdSpec, WavFormat,
//! };
//!
//! // 1000 silent frames followed by 500 loud ones
//! let format = WavFormat::pcm(1, 8000, 16);
//! let mut samples = vec![0i32; 1000];
//! samples.extend(std::iter::repeat(5000).take(500));
//! let bytes = wavsk::io::write_wav(&format, &samples).unwrap();
//!
//! let mut reader = DecodedSampleReader::open(Cursor::new(bytes), &CacheConfig::new()).unwrap();
//! let mut engine = BoundarySearchEngine::new(&format, SearchParams::new()).unwrap();
//! let thresholds = ThresholdSpec::symmetric(100, 1);
//!
//! let result = engine
//!     .find_boundary(&mut reader, &SearchRequest::signal(0, &thresholds))
//!     .unwrap();
//! assert_eq!(result, SearchResult::Found(1000));
//! ```
//!
//! # Non-silent runs
//!
//! [`find_non_silent_runs`] alternates signal and silence searches across a
//! whole stream and returns every run of signal separated by at least the
//! requested amount of silence.

pub mod actions;
pub mod cache;
pub mod core;
pub mod error;
pub mod io;
pub mod search;
pub mod spectral;

pub use actions::{create_action, process_file, Action, AnalyzeReport, Duration};
pub use cache::{DecodedSampleReader, RawSampleReader, WindowCache};
pub use crate::core::params::{CacheConfig, SearchParams};
pub use crate::core::types::{Direction, SampleIndex, ThresholdSpec, WavFormat};
pub use error::{Result, WskError};
pub use io::{OutputSink, WavSink};
pub use search::{
    find_non_silent_runs, BoundarySearchEngine, NonSilentRun, RunQuery, SearchRequest,
    SearchResult,
};
pub use spectral::{NoiseProfile, SpectralProfile, SpectralProfiler};
