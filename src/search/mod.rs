//! Silence/signal boundary search and non-silent run enumeration.

pub mod engine;
pub mod history;
pub mod runs;

pub use engine::{BoundarySearchEngine, SearchRequest, SearchResult, SearchState, Target};
pub use history::{ProbeDistance, SearchHistory};
pub use runs::{find_non_silent_runs, merge_short_gaps, NonSilentRun, NonSilentRuns, RunQuery};
