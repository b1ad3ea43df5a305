//! Core types, parameters, and the fixed-capacity ring buffer.

pub mod params;
pub mod ring_buffer;
pub mod types;

pub use params::{CacheConfig, SearchParams};
pub use types::*;
