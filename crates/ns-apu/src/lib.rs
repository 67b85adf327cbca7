//! NES APU emulation.
//!
//! Four tone generators (two pulse, triangle, noise) built from small
//! timer units, clocked by the master cycle and a 4-step frame
//! sequencer, and mixed through the console's nonlinear output stage.
//! The mixed output leaves the APU as a stream of level transitions.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod apu;
mod channel;
mod divider;
mod envelope;
mod frame_sequencer;
mod length_counter;
mod lfsr;
mod linear_counter;
pub mod mixer;
mod noise;
mod pulse;
mod step_stream;
mod sweep;
mod triangle;

pub use apu::{Apu, DEFAULT_EVENT_CAPACITY};
pub use channel::{ChannelId, ChannelState, Listener};
pub use divider::Divider;
pub use envelope::Envelope;
pub use frame_sequencer::{FrameClock, FrameSequencer, FRAME_PERIOD, QUARTER_FRAMES};
pub use length_counter::{LengthCounter, LENGTH_TABLE};
pub use lfsr::{NoiseLfsr, NoiseMode};
pub use linear_counter::LinearCounter;
pub use noise::{Noise, NOISE_PERIODS_NTSC, NOISE_PERIODS_PAL};
pub use pulse::{Pulse, DUTY_TABLE};
pub use step_stream::StepStream;
pub use sweep::{NegateMode, Sweep, SweepOutcome, MAX_PERIOD, MIN_PERIOD};
pub use triangle::{Triangle, TRIANGLE_TABLE};
