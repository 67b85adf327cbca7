//! Volume envelope generator (pulse and noise).

use crate::divider::Divider;

/// Decaying 4-bit volume, or a constant volume when `constant` is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    divider: Divider,
    counter: u8,
    start: bool,
    constant: bool,
    looping: bool,
    volume: u8,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the control byte fields: volume/period, constant flag and loop
    /// flag (the same bit as the length counter halt).
    pub fn configure(&mut self, volume: u8, constant: bool, looping: bool) {
        self.volume = volume & 0x0F;
        self.constant = constant;
        self.looping = looping;
        self.divider.period = u16::from(self.volume);
    }

    /// Request a restart on the next quarter frame.
    pub fn restart(&mut self) {
        self.start = true;
    }

    /// Quarter-frame clock.
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.counter = 15;
            self.divider.reload();
        } else if self.divider.clock() {
            if self.counter > 0 {
                self.counter -= 1;
            } else if self.looping {
                self.counter = 15;
            }
        }
    }

    /// Current output volume, 0-15.
    pub fn volume(&self) -> u8 {
        if self.constant {
            self.volume
        } else {
            self.counter
        }
    }
}
