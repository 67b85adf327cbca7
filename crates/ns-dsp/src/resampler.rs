//! Streaming step-event to fixed-rate sample converter.

use alloc::sync::Arc;
use alloc::vec::Vec;
use ns_ir::StepEvent;

use crate::kernel::{KernelError, StepKernel};

/// Output rate and kernel shape for a [`Resampler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResamplerConfig {
    pub sample_rate: u32,
    /// Kernel half-width in output samples; also the output latency.
    pub radius: usize,
    /// Sub-sample phase resolution of the kernel table.
    pub phase_count: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            radius: 5,
            phase_count: 32,
        }
    }
}

impl ResamplerConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Build the kernel this configuration describes.
    pub fn kernel(&self) -> Result<StepKernel, KernelError> {
        StepKernel::lanczos(self.radius, self.phase_count)
    }

    /// Build the kernel and a resampler around it.
    pub fn build(&self) -> Result<Resampler, KernelError> {
        Resampler::new(Arc::new(self.kernel()?), self.sample_rate)
    }
}

/// Converts step events into band-limited samples.
///
/// Samples are final once no later event can touch them: after an event
/// at sample position `p`, everything before `floor(p - radius)` is
/// emitted. Events whose kernel support lies entirely behind that horizon
/// are evicted. An event that is out of order, or whose support reaches
/// samples already emitted, resyncs the output to its amplitude.
#[derive(Clone, Debug)]
pub struct Resampler {
    kernel: Arc<StepKernel>,
    sample_rate: f64,
    /// First sample not yet emitted.
    horizon: i64,
    /// Input level after the last event.
    level: f64,
    /// Sample position of the last accepted event.
    last_position: f64,
    /// Running output value (sum of emitted deltas).
    output: f64,
    /// `(position in samples, delta)` of events still in the kernel window.
    pending: Vec<(f64, f64)>,
    scratch: Vec<f64>,
    resyncs: u64,
}

impl Resampler {
    pub fn new(kernel: Arc<StepKernel>, sample_rate: u32) -> Result<Self, KernelError> {
        if sample_rate == 0 {
            return Err(KernelError::ZeroSampleRate);
        }
        Ok(Self {
            kernel,
            sample_rate: f64::from(sample_rate),
            horizon: 0,
            level: 0.0,
            last_position: f64::NEG_INFINITY,
            output: 0.0,
            pending: Vec::new(),
            scratch: Vec::new(),
            resyncs: 0,
        })
    }

    pub fn kernel(&self) -> &Arc<StepKernel> {
        &self.kernel
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Samples emitted so far.
    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// Input level after the last processed event.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Events still contributing to unfinished samples.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Out-of-order events dropped so far.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    pub fn process(&mut self, events: &[StepEvent]) -> Vec<f32> {
        let mut out = Vec::new();
        self.process_into(events, &mut out);
        out
    }

    /// Append the samples finalized by `events` to `out`.
    pub fn process_into(&mut self, events: &[StepEvent], out: &mut Vec<f32>) {
        let radius = self.kernel.radius() as f64;
        for event in events {
            let position = event.time * self.sample_rate;
            let start = self.kernel.support_start(position);
            // Nothing is emitted while the horizon is zero
            if position < self.last_position || (self.horizon > 0 && start < self.horizon) {
                log::warn!(
                    "step at sample {:.2} overlaps emitted output (horizon {}), resyncing",
                    position,
                    self.horizon
                );
                self.resync(event.amplitude);
                continue;
            }

            let delta = event.amplitude - self.level;
            self.level = event.amplitude;
            self.last_position = position;
            if start < self.horizon && delta != 0.0 {
                // Samples before zero are never emitted; fold their share in
                self.output += delta * self.kernel.sum_before(position, self.horizon);
            }
            let end = libm::floor(position - radius) as i64;
            if end > self.horizon {
                self.finalize(end, out);
            }
            if delta != 0.0 {
                self.pending.push((position, delta));
            }
        }
    }

    /// Emit everything final at `time` without changing the level.
    pub fn advance_to(&mut self, time: f64, out: &mut Vec<f32>) {
        let event = StepEvent::new(time, self.level);
        self.process_into(&[event], out);
    }

    /// Forget all state; output restarts from silence at sample zero.
    pub fn reset(&mut self) {
        self.horizon = 0;
        self.level = 0.0;
        self.last_position = f64::NEG_INFINITY;
        self.output = 0.0;
        self.pending.clear();
    }

    fn finalize(&mut self, end: i64, out: &mut Vec<f32>) {
        let count = (end - self.horizon) as usize;
        self.scratch.clear();
        self.scratch.resize(count, 0.0);
        self.kernel.convolve_into(self.horizon, &mut self.scratch, &self.pending);

        out.reserve(count);
        for delta in &self.scratch {
            self.output += delta;
            out.push(self.output as f32);
        }
        self.horizon = end;

        let done = (self.horizon - self.kernel.radius() as i64) as f64;
        let finished = self.pending.iter().take_while(|(p, _)| *p < done).count();
        self.pending.drain(..finished);
    }

    fn resync(&mut self, amplitude: f64) {
        self.level = amplitude;
        self.output = amplitude;
        self.pending.clear();
        self.resyncs += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: u32 = 1000;

    fn resampler() -> Resampler {
        ResamplerConfig {
            sample_rate: RATE,
            radius: 5,
            phase_count: 32,
        }
        .build()
        .unwrap()
    }

    fn at(sample: f64, amplitude: f64) -> StepEvent {
        StepEvent::new(sample / f64::from(RATE), amplitude)
    }

    #[test]
    fn isolated_step_integrates_to_its_height() {
        let mut rs = resampler();
        let mut out = rs.process(&[at(100.3, 0.75)]);
        assert_eq!(out.len(), 95);
        assert!(out.iter().all(|&s| s == 0.0));

        out.extend(rs.process(&[at(200.0, 0.75)]));
        assert_eq!(out.len(), 195);
        let last = *out.last().unwrap();
        assert_abs_diff_eq!(f64::from(last), 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(rs.output, 0.75, epsilon = 1e-9);
        assert_eq!(rs.pending_len(), 0);
    }

    #[test]
    fn ringing_stays_near_the_edge() {
        let mut rs = resampler();
        let out = rs.process(&[at(50.0, 1.0), at(120.0, 1.0)]);
        // Before the kernel window: silent; well after: settled
        assert!(out[..44].iter().all(|&s| s == 0.0));
        assert!(out[56..].iter().all(|&s| (s - 1.0).abs() < 1e-6));
        // Overshoot is bounded
        assert!(out.iter().all(|&s| s > -0.2 && s < 1.2));
    }

    #[test]
    fn batch_boundaries_do_not_change_output() {
        let events: Vec<StepEvent> = (1..40)
            .map(|i| at(f64::from(i) * 7.37, if i % 2 == 0 { 0.0 } else { 0.5 }))
            .collect();

        let mut whole = resampler();
        let a = whole.process(&events);

        let mut split = resampler();
        let mut b = Vec::new();
        for chunk in events.chunks(3) {
            split.process_into(chunk, &mut b);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn late_event_resyncs() {
        let mut rs = resampler();
        rs.process(&[at(100.0, 0.5)]);
        assert_eq!(rs.horizon(), 95);

        let out = rs.process(&[at(90.0, 0.25)]);
        assert!(out.is_empty());
        assert_eq!(rs.resync_count(), 1);
        assert_eq!(rs.pending_len(), 0);
        assert_eq!(rs.level(), 0.25);

        let out = rs.process(&[at(200.0, 0.25)]);
        assert!(out.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn step_overlapping_emitted_samples_resyncs() {
        let mut rs = resampler();
        rs.process(&[at(100.3, 0.75)]);
        assert_eq!(rs.horizon(), 95);

        // Past the horizon, but its kernel row starts at sample 92
        assert!(rs.process(&[at(97.0, 0.0)]).is_empty());
        assert_eq!(rs.resync_count(), 1);

        let out = rs.process(&[at(400.0, 0.0)]);
        assert_eq!(out.len(), 300);
        assert_abs_diff_eq!(f64::from(*out.last().unwrap()), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rs.output, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn step_before_last_event_resyncs() {
        let mut rs = resampler();
        rs.process(&[at(100.9, 0.5)]);
        assert_eq!(rs.horizon(), 95);
        rs.process(&[at(100.2, 0.25)]);
        assert_eq!(rs.resync_count(), 1);
        assert_eq!(rs.level(), 0.25);
    }

    #[test]
    fn step_at_time_zero_is_not_late() {
        let mut rs = resampler();
        let mut out = rs.process(&[at(0.0, 0.5)]);
        assert!(out.is_empty());
        assert_eq!(rs.resync_count(), 0);
        assert_eq!(rs.pending_len(), 1);

        out.extend(rs.process(&[at(50.0, 0.5)]));
        assert_eq!(out.len(), 45);
        // Centred step: about half of it is already in the first sample
        assert!(out[0] > 0.25 && out[0] < 0.75, "first {}", out[0]);
        assert_abs_diff_eq!(f64::from(out[44]), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn advance_to_flushes_at_current_level() {
        let mut rs = resampler();
        let mut out = Vec::new();
        rs.process_into(&[at(10.0, 0.5)], &mut out);
        rs.advance_to(1.0, &mut out);
        assert_eq!(out.len(), 995);
        assert_abs_diff_eq!(f64::from(out[994]), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn reset_restarts_from_silence() {
        let mut rs = resampler();
        rs.process(&[at(10.0, 0.5), at(40.0, 0.5)]);
        rs.reset();
        assert_eq!(rs.horizon(), 0);
        assert_eq!(rs.level(), 0.0);
        let out = rs.process(&[at(30.0, 0.0)]);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let kernel = Arc::new(StepKernel::lanczos(3, 8).unwrap());
        assert_eq!(
            Resampler::new(kernel, 0).unwrap_err(),
            KernelError::ZeroSampleRate
        );
    }
}
