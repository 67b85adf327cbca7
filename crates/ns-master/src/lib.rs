//! Headless controller for nesound.
//!
//! Provides a unified API for driving the APU from a register script,
//! rendering offline and playing through the audio device, shared by the
//! CLI and the integration tests.

mod error;
mod pipeline;
mod script;
mod source;
mod wav;

use ns_audio::{AudioOutput, BufferedSink, CpalOutput};
use ns_dsp::ResamplerConfig;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Re-export common types so callers don't need the lower crates directly.
pub use error::Error;
pub use ns_apu::ChannelId;
pub use ns_audio::{SinkConfig, SinkStats};
pub use ns_ir::Region;
pub use pipeline::{Pipeline, StreamEnd, DEFAULT_BATCH_SECONDS};
pub use script::{demo_script, pulse_period, triangle_period, RegisterScript, RegisterWrite};
pub use source::{ScriptSource, StepSource};
pub use wav::{samples_to_wav, write_wav};

/// How often the playback thread checks whether the device has drained.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Headless controller: owns a register script and manages playback.
pub struct Controller {
    script: RegisterScript,
    region: Region,
    resampler: ResamplerConfig,
    sink: SinkConfig,
    muted: [bool; 4],
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    samples_written: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
    sink: BufferedSink,
    thread: Option<JoinHandle<()>>,
}

/// State shared with a playback thread.
#[derive(Clone)]
struct Signals {
    stop: Arc<AtomicBool>,
    written: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl Signals {
    fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            written: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Controller {
    /// Controller loaded with the built-in demo tune.
    pub fn new() -> Self {
        Self::with_script(demo_script(Region::Ntsc), Region::Ntsc)
    }

    pub fn with_script(script: RegisterScript, region: Region) -> Self {
        Self {
            script,
            region,
            resampler: ResamplerConfig::default(),
            sink: SinkConfig::default(),
            muted: [false; 4],
            playback: None,
        }
    }

    // --- Configuration ---

    pub fn script(&self) -> &RegisterScript {
        &self.script
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn load_script(&mut self, script: RegisterScript, region: Region) {
        self.stop();
        self.script = script;
        self.region = region;
    }

    /// Kernel shape; the sample rate is set per render or by the device.
    pub fn set_resampler_config(&mut self, config: ResamplerConfig) {
        self.resampler = config;
    }

    /// Ring buffer sizing for live playback; the device decides the rate.
    pub fn set_sink_config(&mut self, config: SinkConfig) {
        self.sink = config;
    }

    /// Applies to renders and playback started afterwards.
    pub fn set_channel_muted(&mut self, id: ChannelId, muted: bool) {
        self.muted[id.index()] = muted;
    }

    /// Script length in seconds.
    pub fn duration(&self) -> f64 {
        self.script.end_cycle() as f64 * self.region.cycle_seconds()
    }

    /// A fresh pipeline over the script at `sample_rate`.
    pub fn pipeline(&self, sample_rate: u32) -> Result<Pipeline<ScriptSource>, Error> {
        let mut source = ScriptSource::new(self.script.clone(), self.region);
        for id in ChannelId::ALL {
            source.apu_mut().set_channel_muted(id, self.muted[id.index()]);
        }
        let resampler = ResamplerConfig {
            sample_rate,
            ..self.resampler
        }
        .build()?;
        Ok(Pipeline::new(source, resampler))
    }

    // --- Real-time playback ---

    /// Play the script on the default audio device.
    pub fn play(&mut self) -> Result<(), Error> {
        self.stop();

        let signals = Signals::new();
        let (started_tx, started_rx) = mpsc::channel();
        let controller = self.detached();
        let thread_signals = signals.clone();
        let thread = thread::Builder::new()
            .name("ns-playback".into())
            .spawn(move || device_thread(controller, thread_signals, started_tx))?;

        match started_rx.recv() {
            Ok(Ok((sink, sample_rate))) => {
                self.playback = Some(PlaybackHandle {
                    stop_signal: signals.stop,
                    samples_written: signals.written,
                    finished: signals.finished,
                    sample_rate,
                    sink,
                    thread: Some(thread),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::PlaybackThread)
            }
        }
    }

    /// Stream the script into `sink` on a background thread. The caller
    /// owns the device side of the sink.
    pub fn play_with(&mut self, sink: BufferedSink) -> Result<(), Error> {
        self.stop();

        let sample_rate = sink.config().sample_rate;
        let pipeline = self.pipeline(sample_rate)?;
        let signals = Signals::new();
        let thread_signals = signals.clone();
        let thread_sink = sink.clone();
        let thread = thread::Builder::new()
            .name("ns-producer".into())
            .spawn(move || produce(pipeline, &thread_sink, &thread_signals))?;

        self.playback = Some(PlaybackHandle {
            stop_signal: signals.stop,
            samples_written: signals.written,
            finished: signals.finished,
            sample_rate,
            sink,
            thread: Some(thread),
        });
        Ok(())
    }

    /// Stop playback, dropping anything still buffered.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            pb.sink.cancel();
            if let Some(handle) = pb.thread.take() {
                if handle.join().is_err() {
                    log::error!("playback thread panicked");
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Seconds of audio committed to the sink.
    pub fn position(&self) -> Option<f64> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        let written = pb.samples_written.load(Ordering::Relaxed);
        Some(written as f64 / f64::from(pb.sample_rate))
    }

    pub fn stats(&self) -> Option<SinkStats> {
        self.playback.as_ref().map(|p| p.sink.stats())
    }

    // --- Offline rendering ---

    /// Render up to `max_seconds` of the script as mono samples.
    pub fn render_samples(&self, sample_rate: u32, max_seconds: f64) -> Result<Vec<f32>, Error> {
        let max_samples = (f64::from(sample_rate) * max_seconds).max(0.0) as usize;
        let mut pipeline = self.pipeline(sample_rate)?;
        let mut samples = Vec::with_capacity(max_samples.min(sample_rate as usize * 600));
        while samples.len() < max_samples {
            let Some(block) = pipeline.next_block() else {
                break;
            };
            samples.extend_from_slice(block);
        }
        samples.truncate(max_samples);
        log::debug!("rendered {} samples at {} Hz", samples.len(), sample_rate);
        Ok(samples)
    }

    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: f64) -> Result<Vec<u8>, Error> {
        let samples = self.render_samples(sample_rate, max_seconds)?;
        Ok(wav::samples_to_wav(&samples, sample_rate))
    }

    /// Settings-only copy handed to a playback thread.
    fn detached(&self) -> Self {
        Self {
            script: self.script.clone(),
            region: self.region,
            resampler: self.resampler,
            sink: self.sink,
            muted: self.muted,
            playback: None,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

type Started = Result<(BufferedSink, u32), Error>;

fn device_thread(controller: Controller, signals: Signals, started: mpsc::Sender<Started>) {
    let setup = || -> Result<_, Error> {
        let mut output = CpalOutput::new()?;
        let sample_rate = output.sample_rate();
        let (sink, reader) = BufferedSink::new(SinkConfig {
            sample_rate,
            ..controller.sink
        })?;
        let pipeline = controller.pipeline(sample_rate)?;
        output.build_stream(reader)?;
        Ok((output, sink, pipeline, sample_rate))
    };

    let (mut output, sink, pipeline, sample_rate) = match setup() {
        Ok(parts) => parts,
        Err(e) => {
            signals.finished.store(true, Ordering::Relaxed);
            let _ = started.send(Err(e));
            return;
        }
    };
    if started.send(Ok((sink.clone(), sample_rate))).is_err() {
        return;
    }

    produce(pipeline, &sink, &signals);
    if let Err(e) = output.stop() {
        log::warn!("failed to pause output: {}", e);
    }
}

/// Feed `sink` until the script ends or a stop is requested, then let the
/// device play out what is buffered.
fn produce(mut pipeline: Pipeline<ScriptSource>, sink: &BufferedSink, signals: &Signals) {
    let pump = sink.spawn_pump();
    let end = pipeline.stream_to(sink, &signals.stop, &signals.written);
    log::debug!("producer ended: {:?}", end);

    if end == StreamEnd::Finished {
        while !signals.stop.load(Ordering::Relaxed) && !sink.is_drained() {
            thread::sleep(DRAIN_POLL);
        }
    }
    sink.cancel();
    pump.stop();
    signals.finished.store(true, Ordering::Relaxed);
}
