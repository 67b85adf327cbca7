use ns_audio::AudioError;
use ns_dsp::KernelError;

/// Errors surfaced by the controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("resampler setup failed: {0}")]
    Kernel(#[from] KernelError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("playback thread exited before the stream started")]
    PlaybackThread,
}
