//! Length counter: automatic note duration.

/// Note lengths in half frames, indexed by the 5-bit length select.
pub const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, //
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Silences its channel once it counts down to zero.
///
/// Loads requested by a length-select write land on the next quarter
/// frame rather than immediately.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LengthCounter {
    counter: u8,
    enabled: bool,
    halt: bool,
    pending: Option<u8>,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status register bit for this channel. Disabling zeroes the counter
    /// and drops any pending load.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
            self.pending = None;
        }
    }

    pub fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// Request a load of `LENGTH_TABLE[index]`; ignored while disabled.
    pub fn request_load(&mut self, index: u8) {
        if self.enabled {
            self.pending = Some(LENGTH_TABLE[usize::from(index & 0x1F)]);
        }
    }

    /// Quarter-frame boundary: apply a pending load.
    pub fn apply_pending(&mut self) {
        if let Some(value) = self.pending.take() {
            self.counter = value;
        }
    }

    /// Half-frame clock.
    pub fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn is_active(&self) -> bool {
        self.counter > 0
    }
}
