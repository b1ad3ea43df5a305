//! Semitone-spaced spectral profiles and their distances.

pub mod kernel;
pub mod noise;
pub mod profile;

pub use kernel::{NumericKernel, ReferenceKernel};
pub use noise::NoiseProfile;
pub use profile::{FrequencyTable, SpectralProfile, SpectralProfiler, DISTANCE_SCALE};
