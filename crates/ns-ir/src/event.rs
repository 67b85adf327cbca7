//! Amplitude step events.

/// A transition of the mixed output to a new level.
///
/// Between two events the output is constant; the resampler turns the
/// sequence of steps into band-limited samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepEvent {
    /// Emulated time of the transition, in seconds since power-on.
    pub time: f64,
    /// Mixed output level from this point on.
    pub amplitude: f64,
}

impl StepEvent {
    pub const fn new(time: f64, amplitude: f64) -> Self {
        Self { time, amplitude }
    }
}
