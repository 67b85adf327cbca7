//! Pulse channel sweep unit.

use crate::divider::Divider;

/// Highest timer period a pulse channel can hold.
pub const MAX_PERIOD: i32 = 0x7FF;
/// Periods below this are inaudible and silence the channel.
pub const MIN_PERIOD: i32 = 8;

/// How a negated sweep delta is applied.
///
/// Pulse 1 adds the one's complement of the delta, pulse 2 the two's
/// complement, so pulse 1 always sweeps one period lower.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NegateMode {
    #[default]
    OnesComplement,
    TwosComplement,
}

/// What a half-frame sweep clock did to the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    Unchanged,
    /// The timer period moves to the carried target.
    Retune(u16),
    /// The target fell out of range; the channel goes silent.
    Silence,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sweep {
    divider: Divider,
    reload: bool,
    enabled: bool,
    negate: bool,
    shift: u8,
    mode: NegateMode,
}

impl Sweep {
    pub fn new(mode: NegateMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Apply the sweep register fields and request a divider reload.
    pub fn configure(&mut self, enabled: bool, period: u8, negate: bool, shift: u8) {
        self.enabled = enabled;
        self.divider.period = u16::from(period & 0x07);
        self.negate = negate;
        self.shift = shift & 0x07;
        self.reload = true;
    }

    /// Target period for `period`, computed signed so a negated sweep can
    /// go below zero.
    pub fn target(&self, period: u16) -> i32 {
        let period = i32::from(period);
        let delta = period >> self.shift;
        match (self.negate, self.mode) {
            (false, _) => period + delta,
            (true, NegateMode::OnesComplement) => period - delta - 1,
            (true, NegateMode::TwosComplement) => period - delta,
        }
    }

    /// Whether `target` is outside the audible range.
    pub fn mutes(target: i32) -> bool {
        !(MIN_PERIOD..=MAX_PERIOD).contains(&target)
    }

    /// Half-frame clock against the channel's current timer period.
    pub fn clock(&mut self, period: u16) -> SweepOutcome {
        let fired = self.divider.clock();
        if self.reload {
            self.divider.reload();
            self.reload = false;
        }
        if !(fired && self.enabled) {
            return SweepOutcome::Unchanged;
        }

        let target = self.target(period);
        if Self::mutes(target) {
            SweepOutcome::Silence
        } else if self.shift == 0 {
            SweepOutcome::Unchanged
        } else {
            SweepOutcome::Retune(target as u16)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_flavours_differ_by_one() {
        let mut ones = Sweep::new(NegateMode::OnesComplement);
        let mut twos = Sweep::new(NegateMode::TwosComplement);
        ones.configure(true, 0, true, 2);
        twos.configure(true, 0, true, 2);
        assert_eq!(ones.target(400), 400 - 100 - 1);
        assert_eq!(twos.target(400), 400 - 100);

        ones.configure(true, 0, false, 2);
        assert_eq!(ones.target(400), 500);
    }

    #[test]
    fn zero_shift_negate_goes_negative() {
        let mut sweep = Sweep::new(NegateMode::OnesComplement);
        sweep.configure(true, 0, true, 0);
        assert_eq!(sweep.target(300), -1);
        assert!(Sweep::mutes(-1));
        assert_eq!(sweep.clock(300), SweepOutcome::Silence);
    }

    #[test]
    fn out_of_range_targets_mute() {
        assert!(Sweep::mutes(0x800));
        assert!(Sweep::mutes(7));
        assert!(!Sweep::mutes(8));
        assert!(!Sweep::mutes(0x7FF));
    }

    #[test]
    fn retunes_on_divider_expiry() {
        let mut sweep = Sweep::new(NegateMode::TwosComplement);
        sweep.configure(true, 1, false, 1);

        // Power-on divider counter is zero, so the first clock fires
        assert_eq!(sweep.clock(200), SweepOutcome::Retune(300));
        // Reload set the counter to 1: one idle clock, then fire again
        assert_eq!(sweep.clock(300), SweepOutcome::Unchanged);
        assert_eq!(sweep.clock(300), SweepOutcome::Retune(450));
    }

    #[test]
    fn disabled_sweep_never_retunes() {
        let mut sweep = Sweep::new(NegateMode::OnesComplement);
        sweep.configure(false, 0, false, 1);
        for _ in 0..10 {
            assert_eq!(sweep.clock(0x600), SweepOutcome::Unchanged);
        }
    }
}
