//! Audio output traits and error types.

use crate::sink::WriteHandle;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// Rejected sink configuration
    #[error("invalid sink configuration: {0}")]
    Config(String),
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}

/// Accepts mono samples from the resampler.
pub trait SampleSink {
    /// Queue `samples`. The returned handle completes once every sample
    /// has been committed (or the write is cancelled).
    fn write(&self, samples: &[f32]) -> WriteHandle;
}
