//! WAV container I/O and output sinks.

pub mod sink;
pub mod wav;

pub use sink::{OutputSink, WavSink};
pub use wav::{read_header, write_header, write_wav, SampleWidth, WavHeader};
