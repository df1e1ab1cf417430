//! Readers and writers for two binary recording formats: multi-channel
//! waveform files ([`WaveFile`]) and single channel event files
//! ([`EventFile`]).

pub mod builder;
pub mod capture;
pub mod error;
pub mod event;
pub mod file;
pub mod resample;
pub mod wave;

pub use builder::{WaveFileBuilder, WaveTemplate};
pub use capture::CaptureTime;
pub use error::PreconditionError;
pub use event::{EventFile, EventHeader, EventRecord};
pub use file::{Mode, OpenError};
pub use resample::resample;
pub use wave::{ChannelData, ChannelInfo, ReadOptions, SampleEncoding, Span, WaveFile, WaveHeader};
