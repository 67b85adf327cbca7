//! Audio output for nesound.
//!
//! [`BufferedSink`] is the producer-facing ring buffer with backpressure;
//! its [`SinkReader`] half is driven by an output device, such as the
//! [`CpalOutput`] backend.

mod config;
mod cpal_backend;
mod sink;
mod traits;

pub use config::SinkConfig;
pub use cpal_backend::CpalOutput;
pub use sink::{
    BufferedSink, CaptureSink, PumpOutcome, PumpThread, SinkReader, SinkStats, WriteHandle,
    WriteStatus,
};
pub use traits::{AudioError, AudioOutput, SampleSink};
