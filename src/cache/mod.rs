//! Bounded sample caches: one generic window engine and its raw/decoded readers.

pub mod decoded;
pub mod raw;
pub mod window;

use std::io::{Read, Seek};

pub use decoded::DecodedSampleReader;
pub use raw::RawSampleReader;
pub use window::{CacheWindow, Flow, WindowCache, WindowSource};

/// Any seekable byte stream a reader can own.
pub trait MediaSource: Read + Seek {}

impl<T: Read + Seek> MediaSource for T {}

/// Reader type the actions operate on.
pub type InputReader = DecodedSampleReader<Box<dyn MediaSource>>;
