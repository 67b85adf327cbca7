//! Buffer of output level transitions awaiting the resampler.

use alloc::vec::Vec;
use ns_ir::StepEvent;

/// Records the mixed output each time it changes.
///
/// Recording into reserved capacity does not allocate; draining hands the
/// buffer off and reserves a fresh one of the same size.
#[derive(Clone, Debug, Default)]
pub struct StepStream {
    events: Vec<StepEvent>,
    capacity: usize,
    last_amplitude: f64,
}

impl StepStream {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            last_amplitude: 0.0,
        }
    }

    /// Append `(time, amplitude)` if the level changed. Returns whether an
    /// event was recorded.
    pub fn record(&mut self, time: f64, amplitude: f64) -> bool {
        if amplitude == self.last_amplitude {
            return false;
        }
        debug_assert!(self.events.last().map_or(true, |e| e.time <= time));
        self.last_amplitude = amplitude;
        self.events.push(StepEvent::new(time, amplitude));
        true
    }

    /// Take the buffered events plus a final `(now, current level)` event
    /// marking how far the stream is known to be complete.
    pub fn drain(&mut self, now: f64) -> Vec<StepEvent> {
        let mut events = core::mem::replace(&mut self.events, Vec::with_capacity(self.capacity));
        events.push(StepEvent::new(now, self.last_amplitude));
        events
    }

    pub fn last_amplitude(&self) -> f64 {
        self.last_amplitude
    }

    /// Events recorded since the last drain.
    pub fn pending(&self) -> usize {
        self.events.len()
    }
}
