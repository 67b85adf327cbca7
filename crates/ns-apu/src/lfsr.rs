//! 15-bit noise shift register.

/// Feedback tap selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoiseMode {
    /// Tap bit 1: 32767-step sequence.
    #[default]
    Long,
    /// Tap bit 6: 93-step metallic sequence.
    Short,
}

impl NoiseMode {
    const fn tap(self) -> u16 {
        match self {
            NoiseMode::Long => 1,
            NoiseMode::Short => 6,
        }
    }
}

/// Linear-feedback shift register; seeded with 1 and never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoiseLfsr {
    register: u16,
    mode: NoiseMode,
}

impl NoiseLfsr {
    pub const fn new() -> Self {
        Self {
            register: 1,
            mode: NoiseMode::Long,
        }
    }

    pub fn set_mode(&mut self, mode: NoiseMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> NoiseMode {
        self.mode
    }

    pub fn clock(&mut self) {
        let r = self.register;
        let feedback = (r ^ (r >> self.mode.tap())) & 1;
        self.register = (r >> 1) | (feedback << 14);
    }

    pub fn register(&self) -> u16 {
        self.register
    }

    /// Bit 0 set mutes the channel.
    pub fn muted(&self) -> bool {
        self.register & 1 == 1
    }
}

impl Default for NoiseLfsr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(mode: NoiseMode) -> usize {
        let mut lfsr = NoiseLfsr::new();
        lfsr.set_mode(mode);
        let start = lfsr.register();
        let mut steps = 0;
        loop {
            lfsr.clock();
            steps += 1;
            assert_ne!(lfsr.register(), 0);
            if lfsr.register() == start {
                return steps;
            }
        }
    }

    #[test]
    fn long_mode_period() {
        assert_eq!(period(NoiseMode::Long), 32767);
    }

    #[test]
    fn short_mode_period() {
        assert_eq!(period(NoiseMode::Short), 93);
    }

    #[test]
    fn stays_within_fifteen_bits() {
        let mut lfsr = NoiseLfsr::new();
        for _ in 0..5000 {
            lfsr.clock();
            assert!(lfsr.register() < 0x8000);
        }
    }
}
