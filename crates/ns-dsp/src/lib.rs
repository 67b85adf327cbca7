//! Band-limited resampling of APU step events.
//!
//! The APU reports its output as sparse level transitions at arbitrary
//! times. This crate turns them into fixed-rate samples by rendering each
//! transition with a precomputed Lanczos step response.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod kernel;
mod resampler;
pub mod special;

pub use kernel::{KernelError, StepKernel};
pub use resampler::{Resampler, ResamplerConfig};
