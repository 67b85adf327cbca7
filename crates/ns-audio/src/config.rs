//! Sink sizing and watermark configuration.

use std::time::Duration;

use crate::traits::AudioError;

/// Ring buffer size and backpressure thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Device frames per second.
    pub sample_rate: u32,
    /// Ring buffer length in seconds of audio.
    pub buffer_seconds: f32,
    /// Writes stop committing above this fill fraction.
    pub high_watermark: f32,
    /// Queued writes resume once the device drains to this fill fraction.
    pub low_watermark: f32,
    /// Shortest pause between pump attempts.
    pub min_retry: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_seconds: 2.0,
            high_watermark: 0.9,
            low_watermark: 0.5,
            min_retry: Duration::from_millis(1),
        }
    }
}

impl SinkConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Quarter-second buffer for interactive use.
    pub fn low_latency(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            buffer_seconds: 0.25,
            ..Self::default()
        }
    }

    /// Ring buffer capacity in frames.
    pub fn capacity_frames(&self) -> usize {
        (self.sample_rate as f32 * self.buffer_seconds).round() as usize
    }

    pub fn high_frames(&self) -> usize {
        (self.capacity_frames() as f32 * self.high_watermark).floor() as usize
    }

    pub fn low_frames(&self) -> usize {
        (self.capacity_frames() as f32 * self.low_watermark).floor() as usize
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::Config("sample rate must be non-zero".into()));
        }
        if !(self.buffer_seconds > 0.0) || self.capacity_frames() == 0 {
            return Err(AudioError::Config(format!(
                "buffer of {} s holds no frames",
                self.buffer_seconds
            )));
        }
        if !(0.0 < self.low_watermark
            && self.low_watermark < self.high_watermark
            && self.high_watermark <= 1.0)
        {
            return Err(AudioError::Config(format!(
                "watermarks must satisfy 0 < low ({}) < high ({}) <= 1",
                self.low_watermark, self.high_watermark
            )));
        }
        if self.high_frames() == 0 {
            return Err(AudioError::Config("high watermark leaves no room".into()));
        }
        Ok(())
    }
}
