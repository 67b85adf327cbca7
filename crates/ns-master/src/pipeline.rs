//! Step source to sample sink plumbing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use ns_audio::{SampleSink, WriteStatus};
use ns_dsp::Resampler;

use crate::source::StepSource;

/// Emulated time produced per batch by default.
pub const DEFAULT_BATCH_SECONDS: f64 = 0.01;
/// How often a blocked producer checks its stop flag.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Why [`Pipeline::stream_to`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source ran out and every sample was committed.
    Finished,
    /// The stop flag was raised.
    Stopped,
    /// The sink cancelled an outstanding write.
    Cancelled,
}

/// Pulls step batches from a source and resamples them.
pub struct Pipeline<S> {
    source: S,
    resampler: Resampler,
    batch_seconds: f64,
    block: Vec<f32>,
    flushed: bool,
}

impl<S: StepSource> Pipeline<S> {
    pub fn new(source: S, resampler: Resampler) -> Self {
        Self {
            source,
            resampler,
            batch_seconds: DEFAULT_BATCH_SECONDS,
            block: Vec::new(),
            flushed: false,
        }
    }

    pub fn with_batch_seconds(mut self, seconds: f64) -> Self {
        self.batch_seconds = seconds;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn resampler(&self) -> &Resampler {
        &self.resampler
    }

    /// Samples produced so far.
    pub fn samples_emitted(&self) -> u64 {
        self.resampler.horizon().max(0) as u64
    }

    /// Resample the next batch. Once the source is exhausted, one last
    /// block flushes the kernel tail; after that, `None`.
    pub fn next_block(&mut self) -> Option<&[f32]> {
        self.block.clear();
        match self.source.next_batch(self.batch_seconds) {
            Some(events) => self.resampler.process_into(&events, &mut self.block),
            None if !self.flushed => {
                self.flushed = true;
                let rate = f64::from(self.resampler.sample_rate());
                let tail = (self.resampler.kernel().radius() + 1) as f64 / rate;
                let end = self.source.current_time() + tail;
                self.resampler.advance_to(end, &mut self.block);
            }
            None => return None,
        }
        Some(&self.block)
    }

    /// Start both the source and the resampler over.
    pub fn rewind(&mut self) {
        self.source.rewind();
        self.resampler.reset();
        self.flushed = false;
    }

    /// Write blocks into `sink` until the source is exhausted, `stop` is
    /// raised or the sink cancels. Each write is waited on in short slices
    /// so a stop request is seen promptly. `written` counts committed
    /// samples.
    pub fn stream_to<K>(&mut self, sink: &K, stop: &AtomicBool, written: &AtomicU64) -> StreamEnd
    where
        K: SampleSink + ?Sized,
    {
        while !stop.load(Ordering::Relaxed) {
            let Some(block) = self.next_block() else {
                return StreamEnd::Finished;
            };
            if block.is_empty() {
                continue;
            }
            let handle = sink.write(block);
            loop {
                match handle.wait_timeout(STOP_POLL) {
                    WriteStatus::Complete => break,
                    WriteStatus::Cancelled => return StreamEnd::Cancelled,
                    WriteStatus::Pending if stop.load(Ordering::Relaxed) => {
                        return StreamEnd::Stopped
                    }
                    WriteStatus::Pending => {}
                }
            }
            written.fetch_add(handle.committed() as u64, Ordering::Relaxed);
        }
        StreamEnd::Stopped
    }
}
