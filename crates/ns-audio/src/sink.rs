//! Ring-buffered sample sink with backpressure.
//!
//! Producers hand mono samples to [`BufferedSink::write`]. Samples are
//! committed to the ring immediately while it is below the high watermark;
//! the remainder waits in a FIFO of pending writes that the pump drains once
//! the device has consumed the ring down to the low watermark. The device
//! side reads through a [`SinkReader`].
//!
//! An underrun watchdog clears the ring and disarms playback when the
//! producer has stopped feeding it: each commit sets a deadline at
//! `occupied + 0.9 * free` device frames from now, and the reset fires only
//! if that deadline passes with no new commit and nothing left to play.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ns_ir::Frame;
use parking_lot::{Condvar, Mutex};
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

use crate::config::SinkConfig;
use crate::traits::{AudioError, SampleSink};

/// Fraction of the free ring space added to the watchdog deadline.
const WATCHDOG_SLACK: f64 = 0.9;
/// Pump sleep when nothing is queued.
const IDLE_POLL: Duration = Duration::from_millis(20);

/// Progress of a single write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    Pending,
    Complete,
    Cancelled,
}

#[derive(Debug)]
struct Progress {
    requested: usize,
    committed: usize,
    status: WriteStatus,
}

#[derive(Debug)]
struct Completion {
    progress: Mutex<Progress>,
    done: Condvar,
}

impl Completion {
    fn new(requested: usize) -> Self {
        Self {
            progress: Mutex::new(Progress {
                requested,
                committed: 0,
                status: WriteStatus::Pending,
            }),
            done: Condvar::new(),
        }
    }

    fn add(&self, frames: usize) {
        self.progress.lock().committed += frames;
    }

    fn finish(&self, status: WriteStatus) {
        let mut progress = self.progress.lock();
        if progress.status == WriteStatus::Pending {
            progress.status = status;
        }
        drop(progress);
        self.done.notify_all();
    }
}

/// Completion handle returned by every write.
#[derive(Clone, Debug)]
pub struct WriteHandle {
    completion: Arc<Completion>,
}

impl WriteHandle {
    fn new(requested: usize) -> Self {
        Self {
            completion: Arc::new(Completion::new(requested)),
        }
    }

    pub(crate) fn completed(requested: usize) -> Self {
        let handle = Self::new(requested);
        handle.completion.add(requested);
        handle.completion.finish(WriteStatus::Complete);
        handle
    }

    pub fn status(&self) -> WriteStatus {
        self.completion.progress.lock().status
    }

    pub fn is_done(&self) -> bool {
        self.status() != WriteStatus::Pending
    }

    /// Samples passed to the write.
    pub fn requested(&self) -> usize {
        self.completion.progress.lock().requested
    }

    /// Samples committed to the ring so far.
    pub fn committed(&self) -> usize {
        self.completion.progress.lock().committed
    }

    /// Block until the write completes or is cancelled.
    pub fn wait(&self) -> WriteStatus {
        let mut progress = self.completion.progress.lock();
        while progress.status == WriteStatus::Pending {
            self.completion.done.wait(&mut progress);
        }
        progress.status
    }

    /// Block for at most `timeout`; returns the status at wake-up.
    pub fn wait_timeout(&self, timeout: Duration) -> WriteStatus {
        let mut progress = self.completion.progress.lock();
        if progress.status == WriteStatus::Pending {
            self.completion.done.wait_for(&mut progress, timeout);
        }
        progress.status
    }
}

struct PendingWrite {
    samples: Vec<f32>,
    offset: usize,
    completion: Arc<Completion>,
}

#[derive(Clone, Copy, Debug)]
struct Watchdog {
    /// Total committed frames when the deadline was set.
    committed: u64,
    /// Device frame count at which the sink resets.
    deadline: u64,
}

struct SinkState {
    ring: HeapRb<Frame>,
    queue: VecDeque<PendingWrite>,
    /// Playback has started; cleared by a watchdog reset or cancel.
    armed: bool,
    starved: bool,
    device_frames: u64,
    committed: u64,
    played: u64,
    underrun_frames: u64,
    resets: u64,
    watchdog: Option<Watchdog>,
}

struct Shared {
    config: SinkConfig,
    capacity: usize,
    high: usize,
    low: usize,
    state: Mutex<SinkState>,
    /// Wakes the pump on new writes, cancel and shutdown.
    wake: Condvar,
}

impl Shared {
    /// Commit as much of `samples` as fits below the high watermark.
    fn commit(&self, state: &mut SinkState, samples: &[f32]) -> usize {
        let room = self.high.saturating_sub(state.ring.occupied_len());
        let count = samples.len().min(room);
        if count == 0 {
            return 0;
        }
        let pushed = state
            .ring
            .push_iter(samples[..count].iter().map(|&s| Frame::mono(s)));
        state.committed += pushed as u64;
        state.armed = true;
        self.arm_watchdog(state);
        pushed
    }

    fn arm_watchdog(&self, state: &mut SinkState) {
        let occupied = state.ring.occupied_len() as f64;
        let slack = WATCHDOG_SLACK * (self.capacity as f64 - occupied);
        state.watchdog = Some(Watchdog {
            committed: state.committed,
            deadline: state.device_frames + (occupied + slack) as u64,
        });
    }

    fn check_watchdog(&self, state: &mut SinkState) -> bool {
        let Some(watchdog) = state.watchdog else {
            return false;
        };
        if state.device_frames < watchdog.deadline
            || state.committed != watchdog.committed
            || !state.ring.is_empty()
            || !state.queue.is_empty()
        {
            return false;
        }
        log::warn!(
            "sink underrun for {} frames with no new data, resetting",
            state.underrun_frames
        );
        state.ring.clear();
        state.armed = false;
        state.starved = false;
        state.watchdog = None;
        state.resets += 1;
        true
    }

    fn pump(&self) -> PumpOutcome {
        let mut state = self.state.lock();
        self.check_watchdog(&mut state);

        let mut committed = 0;
        while let Some(mut write) = state.queue.pop_front() {
            let pushed = self.commit(&mut state, &write.samples[write.offset..]);
            write.offset += pushed;
            committed += pushed;
            write.completion.add(pushed);
            if write.offset < write.samples.len() {
                state.queue.push_front(write);
                break;
            }
            write.completion.finish(WriteStatus::Complete);
        }

        let pending = state.queue.len();
        let retry_after = (pending > 0).then(|| {
            let excess = state.ring.occupied_len().saturating_sub(self.low);
            let wait = Duration::from_secs_f64(excess as f64 / f64::from(self.config.sample_rate));
            wait.max(self.config.min_retry)
        });
        if committed > 0 {
            log::trace!("pump committed {} frames, {} writes pending", committed, pending);
        }

        PumpOutcome {
            committed,
            pending,
            retry_after,
        }
    }
}

/// Result of one pump pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpOutcome {
    /// Frames moved from the queue into the ring.
    pub committed: usize,
    /// Writes still waiting.
    pub pending: usize,
    /// When to try again; `None` when the queue is empty.
    pub retry_after: Option<Duration>,
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SinkStats {
    pub committed: u64,
    pub played: u64,
    pub device_frames: u64,
    pub underrun_frames: u64,
    pub resets: u64,
    pub pending_writes: usize,
    /// Ring occupancy as a fraction of capacity.
    pub fill: f32,
}

/// Producer side of the sink. Clones share the same ring.
#[derive(Clone)]
pub struct BufferedSink {
    shared: Arc<Shared>,
}

impl BufferedSink {
    /// Create a sink and the reader the output device drains it through.
    pub fn new(config: SinkConfig) -> Result<(Self, SinkReader), AudioError> {
        config.validate()?;
        let capacity = config.capacity_frames();
        let shared = Arc::new(Shared {
            config,
            capacity,
            high: config.high_frames(),
            low: config.low_frames(),
            state: Mutex::new(SinkState {
                ring: HeapRb::new(capacity),
                queue: VecDeque::new(),
                armed: false,
                starved: false,
                device_frames: 0,
                committed: 0,
                played: 0,
                underrun_frames: 0,
                resets: 0,
                watchdog: None,
            }),
            wake: Condvar::new(),
        });
        log::debug!(
            "sink ready: {} frames at {} Hz, watermarks {}/{}",
            capacity,
            config.sample_rate,
            shared.low,
            shared.high
        );
        let reader = SinkReader {
            shared: Arc::clone(&shared),
        };
        Ok((Self { shared }, reader))
    }

    pub fn config(&self) -> &SinkConfig {
        &self.shared.config
    }

    /// Ring capacity in frames.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Commit what fits now and queue the rest behind earlier writes.
    pub fn write(&self, samples: &[f32]) -> WriteHandle {
        if samples.is_empty() {
            return WriteHandle::completed(0);
        }
        let handle = WriteHandle::new(samples.len());
        let mut state = self.shared.state.lock();
        let pushed = if state.queue.is_empty() {
            self.shared.commit(&mut state, samples)
        } else {
            0
        };
        handle.completion.add(pushed);
        if pushed == samples.len() {
            handle.completion.finish(WriteStatus::Complete);
            return handle;
        }
        state.queue.push_back(PendingWrite {
            samples: samples[pushed..].to_vec(),
            offset: 0,
            completion: Arc::clone(&handle.completion),
        });
        drop(state);
        self.shared.wake.notify_all();
        handle
    }

    /// Move queued samples into the ring; normally run by [`PumpThread`].
    pub fn pump(&self) -> PumpOutcome {
        self.shared.pump()
    }

    /// Start a background thread that pumps until stopped.
    pub fn spawn_pump(&self) -> PumpThread {
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("ns-sink-pump".into())
            .spawn(move || pump_loop(&shared, &thread_stop))
            .map_err(|e| log::error!("failed to spawn sink pump: {}", e))
            .ok();
        PumpThread {
            stop,
            shared: Arc::clone(&self.shared),
            handle,
        }
    }

    /// Drop every queued write and everything buffered; pending handles
    /// resolve as cancelled.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        let dropped = state.queue.len();
        for write in state.queue.drain(..) {
            write.completion.finish(WriteStatus::Cancelled);
        }
        state.ring.clear();
        state.armed = false;
        state.starved = false;
        state.watchdog = None;
        drop(state);
        self.shared.wake.notify_all();
        log::debug!("sink cancelled with {} writes pending", dropped);
    }

    pub fn stats(&self) -> SinkStats {
        let state = self.shared.state.lock();
        SinkStats {
            committed: state.committed,
            played: state.played,
            device_frames: state.device_frames,
            underrun_frames: state.underrun_frames,
            resets: state.resets,
            pending_writes: state.queue.len(),
            fill: state.ring.occupied_len() as f32 / self.shared.capacity as f32,
        }
    }

    /// Audio in the ring, in seconds.
    pub fn buffered_seconds(&self) -> f64 {
        let occupied = self.shared.state.lock().ring.occupied_len();
        occupied as f64 / f64::from(self.shared.config.sample_rate)
    }

    /// Nothing queued and nothing left to play.
    pub fn is_drained(&self) -> bool {
        let state = self.shared.state.lock();
        state.queue.is_empty() && state.ring.is_empty()
    }
}

impl SampleSink for BufferedSink {
    fn write(&self, samples: &[f32]) -> WriteHandle {
        BufferedSink::write(self, samples)
    }
}

fn pump_loop(shared: &Shared, stop: &AtomicBool) {
    log::debug!("sink pump started");
    while !stop.load(Ordering::Acquire) {
        let outcome = shared.pump();
        let mut state = shared.state.lock();
        if stop.load(Ordering::Acquire) {
            break;
        }
        // A write may have been queued since the pass above
        if outcome.retry_after.is_none() && !state.queue.is_empty() {
            continue;
        }
        let wait = outcome.retry_after.unwrap_or(IDLE_POLL);
        shared.wake.wait_for(&mut state, wait);
    }
    log::debug!("sink pump stopped");
}

/// Background pump; stops and joins on drop.
pub struct PumpThread {
    stop: Arc<AtomicBool>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl PumpThread {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("sink pump panicked");
            }
        }
    }
}

impl Drop for PumpThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Device side of a [`BufferedSink`].
pub struct SinkReader {
    shared: Arc<Shared>,
}

impl SinkReader {
    pub fn sample_rate(&self) -> u32 {
        self.shared.config.sample_rate
    }

    /// Fill an interleaved buffer of `channels` channels. Left and right
    /// go to the first two channels; extras are zeroed. Missing data while
    /// armed is counted as underrun and played as silence.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut state = self.shared.state.lock();
        for chunk in out.chunks_mut(channels) {
            let frame = self.next_frame(&mut state);
            for (i, sample) in chunk.iter_mut().enumerate() {
                *sample = match i {
                    0 => frame.left,
                    1 => frame.right,
                    _ => 0.0,
                };
            }
        }
        self.shared.check_watchdog(&mut state);
    }

    /// Pull `count` frames; convenient for offline consumers and tests.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut state = self.shared.state.lock();
        let frames = (0..count).map(|_| self.next_frame(&mut state)).collect();
        self.shared.check_watchdog(&mut state);
        frames
    }

    fn next_frame(&self, state: &mut SinkState) -> Frame {
        state.device_frames += 1;
        if !state.armed {
            return Frame::silence();
        }
        match state.ring.try_pop() {
            Some(frame) => {
                state.played += 1;
                state.starved = false;
                frame
            }
            None => {
                if !state.starved {
                    log::debug!("sink underrun at device frame {}", state.device_frames);
                    state.starved = true;
                }
                state.underrun_frames += 1;
                Frame::silence()
            }
        }
    }
}

/// Sink that keeps every sample in memory; writes always complete.
#[derive(Debug, Default)]
pub struct CaptureSink {
    samples: Mutex<Vec<f32>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples.into_inner()
    }
}

impl SampleSink for CaptureSink {
    fn write(&self, samples: &[f32]) -> WriteHandle {
        self.samples.lock().extend_from_slice(samples);
        WriteHandle::completed(samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1000 frames of capacity, watermarks at 500 and 900.
    fn small_sink() -> (BufferedSink, SinkReader) {
        BufferedSink::new(SinkConfig {
            sample_rate: 1000,
            buffer_seconds: 1.0,
            ..SinkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn small_write_completes_immediately() {
        let (sink, _reader) = small_sink();
        let handle = sink.write(&[0.5; 100]);
        assert_eq!(handle.status(), WriteStatus::Complete);
        assert_eq!(handle.committed(), 100);
        assert_eq!(sink.stats().committed, 100);
        assert!((sink.buffered_seconds() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn empty_write_is_complete() {
        let (sink, _reader) = small_sink();
        let handle = sink.write(&[]);
        assert!(handle.is_done());
        assert_eq!(handle.requested(), 0);
        assert_eq!(sink.stats().committed, 0);
    }

    #[test]
    fn oversized_write_stops_at_high_watermark() {
        let (sink, _reader) = small_sink();
        let handle = sink.write(&[0.25; 2000]);
        assert_eq!(handle.status(), WriteStatus::Pending);
        assert_eq!(handle.committed(), 900);

        let outcome = sink.pump();
        assert_eq!(outcome.committed, 0);
        assert_eq!(outcome.pending, 1);
        // 400 frames above the low watermark at 1 kHz
        assert_eq!(outcome.retry_after, Some(Duration::from_millis(400)));
    }

    #[test]
    fn later_write_waits_behind_queue() {
        let (sink, mut reader) = small_sink();
        let first = sink.write(&[0.25; 950]);
        let second = sink.write(&[0.75; 10]);
        assert_eq!(second.committed(), 0);

        reader.render_frames(500);
        sink.pump();
        assert_eq!(first.status(), WriteStatus::Complete);
        assert_eq!(second.status(), WriteStatus::Complete);

        let frames = reader.render_frames(460);
        assert_eq!(frames[449], Frame::mono(0.25));
        assert_eq!(frames[450], Frame::mono(0.75));
    }

    #[test]
    fn render_interleaves_and_zero_fills() {
        let (sink, mut reader) = small_sink();
        sink.write(&[0.5, -0.5]);
        let mut out = [1.0f32; 9];
        reader.render(&mut out, 3);
        assert_eq!(out, [0.5, 0.5, 0.0, -0.5, -0.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(sink.stats().underrun_frames, 1);
    }

    #[test]
    fn silence_before_first_commit_is_not_underrun() {
        let (sink, mut reader) = small_sink();
        reader.render_frames(50);
        let stats = sink.stats();
        assert_eq!(stats.device_frames, 50);
        assert_eq!(stats.underrun_frames, 0);
    }

    #[test]
    fn cancel_resolves_pending_writes() {
        let (sink, mut reader) = small_sink();
        let handle = sink.write(&[0.25; 2000]);
        sink.cancel();
        assert_eq!(handle.status(), WriteStatus::Cancelled);
        assert_eq!(handle.committed(), 900);
        assert!(sink.is_drained());
        assert!(reader.render_frames(10).iter().all(|f| *f == Frame::silence()));
        assert_eq!(sink.stats().underrun_frames, 0);
    }

    #[test]
    fn capture_sink_collects() {
        let sink = CaptureSink::new();
        assert!(sink.write(&[0.1, 0.2]).is_done());
        sink.write(&[0.3]);
        assert_eq!(sink.into_samples(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn rejects_invalid_config() {
        let result = BufferedSink::new(SinkConfig::new(0));
        assert!(matches!(result, Err(AudioError::Config(_))));
    }
}
