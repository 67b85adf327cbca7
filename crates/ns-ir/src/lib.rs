//! Shared vocabulary for the nesound APU.
//!
//! This crate defines the types every other crate speaks: the console
//! region and its master clock, step events, output frames and the
//! memory-mapped register bus the channels listen on.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod clock;
mod event;
mod frame;
pub mod registers;

pub use clock::{MasterClock, Region, TimeSource};
pub use event::StepEvent;
pub use frame::Frame;
pub use registers::{Notifications, RegisterBus, RegisterObserver, RegisterView, MAX_NOTIFICATIONS};
