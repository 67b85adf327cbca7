//! Triangle linear counter.

/// Second, finer-grained duration counter for the triangle channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearCounter {
    counter: u8,
    reload_value: u8,
    reload: bool,
    /// Also the length counter halt flag. While set, the reload flag is
    /// never cleared and the counter holds its reload value.
    control: bool,
}

impl LinearCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, control: bool, reload_value: u8) {
        self.control = control;
        self.reload_value = reload_value & 0x7F;
    }

    pub fn request_reload(&mut self) {
        self.reload = true;
    }

    /// Quarter-frame clock.
    pub fn clock(&mut self) {
        if self.reload {
            self.counter = self.reload_value;
        } else if self.counter > 0 {
            self.counter -= 1;
        }
        if !self.control {
            self.reload = false;
        }
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn is_active(&self) -> bool {
        self.counter > 0
    }
}
