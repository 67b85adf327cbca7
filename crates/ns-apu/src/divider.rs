//! Programmable down-counter shared by every timer unit.

/// Counts down from `period`; fires and reloads when clocked at zero.
///
/// A period of `P` therefore fires once every `P + 1` clocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Divider {
    pub period: u16,
    counter: u16,
}

impl Divider {
    pub const fn new(period: u16) -> Self {
        Self { period, counter: 0 }
    }

    pub const fn counter(&self) -> u16 {
        self.counter
    }

    /// Restart the count from `period`.
    pub fn reload(&mut self) {
        self.counter = self.period;
    }

    /// Clock once. Returns `true` when the divider fires.
    pub fn clock(&mut self) -> bool {
        if self.counter == 0 {
            self.counter = self.period;
            true
        } else {
            self.counter -= 1;
            false
        }
    }
}
