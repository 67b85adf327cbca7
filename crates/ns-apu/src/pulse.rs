//! Pulse (square wave) channels.

use ns_ir::{RegisterBus, RegisterView};

use crate::channel::{ChannelId, Listener};
use crate::divider::Divider;
use crate::envelope::Envelope;
use crate::length_counter::LengthCounter;
use crate::sweep::{NegateMode, Sweep, SweepOutcome};

/// Output level per sequencer step for each duty setting
/// (12.5%, 25%, 50%, 25% negated).
pub const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Bit fields of a 4-byte pulse register block.
#[derive(Clone, Copy, Debug)]
struct PulseFields {
    volume: RegisterView,
    constant: RegisterView,
    halt: RegisterView,
    duty: RegisterView,
    sweep_shift: RegisterView,
    sweep_negate: RegisterView,
    sweep_period: RegisterView,
    sweep_enabled: RegisterView,
    period: RegisterView,
    length_index: RegisterView,
}

impl PulseFields {
    const fn new(base: u16) -> Self {
        Self {
            volume: RegisterView::new(base, 0, 4),
            constant: RegisterView::new(base, 4, 1),
            halt: RegisterView::new(base, 5, 1),
            duty: RegisterView::new(base, 6, 2),
            sweep_shift: RegisterView::new(base, 8, 3),
            sweep_negate: RegisterView::new(base, 11, 1),
            sweep_period: RegisterView::new(base, 12, 3),
            sweep_enabled: RegisterView::new(base, 15, 1),
            period: RegisterView::new(base, 16, 11),
            length_index: RegisterView::new(base, 27, 5),
        }
    }
}

/// One pulse channel bound to its register block.
#[derive(Clone, Debug)]
pub struct Pulse {
    base: u16,
    fields: PulseFields,
    duty_index: u8,
    sequence_phase: u8,
    envelope: Envelope,
    sweep: Sweep,
    length: LengthCounter,
    timer_period: u16,
    timer: Divider,
    /// Set by an out-of-range sweep target, cleared by period writes.
    silenced: bool,
}

impl Pulse {
    pub fn new(base: u16, negate: NegateMode) -> Self {
        Self {
            base,
            fields: PulseFields::new(base),
            duty_index: 0,
            sequence_phase: 0,
            envelope: Envelope::new(),
            sweep: Sweep::new(negate),
            length: LengthCounter::new(),
            timer_period: 0,
            timer: Divider::new(0),
            silenced: false,
        }
    }

    /// Register write strobes on all four bytes and a change listener on
    /// the 11-bit timer period.
    pub fn attach(&self, bus: &mut RegisterBus<Listener>, id: ChannelId) {
        for offset in 0..4 {
            bus.on_write(self.base + offset, Listener::Write(id));
        }
        bus.watch(self.fields.period, Listener::Period(id));
    }

    pub fn period_view(&self) -> RegisterView {
        self.fields.period
    }

    pub fn on_register_write(&mut self, bus: &RegisterBus<Listener>, addr: u16, value: u8) {
        log::trace!("pulse ${addr:04X} <- ${value:02X}");
        let f = self.fields;
        let field = |view: RegisterView| bus.get(view) as u8;
        match addr.wrapping_sub(self.base) {
            0 => {
                let halt = field(f.halt) != 0;
                self.duty_index = field(f.duty);
                self.envelope.configure(field(f.volume), field(f.constant) != 0, halt);
                self.length.set_halt(halt);
            }
            1 => self.sweep.configure(
                field(f.sweep_enabled) != 0,
                field(f.sweep_period),
                field(f.sweep_negate) != 0,
                field(f.sweep_shift),
            ),
            2 => self.silenced = false,
            3 => {
                self.sequence_phase = 0;
                self.envelope.restart();
                self.length.request_load(field(f.length_index));
                self.silenced = false;
            }
            _ => {}
        }
    }

    /// The timer period bits changed, by a CPU store or a sweep retune.
    pub fn on_period_change(&mut self, bus: &RegisterBus<Listener>) {
        self.timer_period = bus.get(self.fields.period) as u16;
        self.timer.period = self.timer_period;
    }

    pub fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.sequence_phase = (self.sequence_phase + 1) % 8;
        }
    }

    /// Quarter-frame clock. Returns the new timer period when the sweep
    /// retunes the channel; the caller stores it back into the registers.
    pub fn clock_frame(&mut self, half_frame: bool) -> Option<u16> {
        self.envelope.clock();
        let mut retune = None;
        if half_frame {
            match self.sweep.clock(self.timer_period) {
                SweepOutcome::Unchanged => {}
                SweepOutcome::Retune(period) => retune = Some(period),
                SweepOutcome::Silence => self.silenced = true,
            }
            self.length.clock();
        }
        self.length.apply_pending();
        retune
    }

    pub fn amplitude(&self) -> u8 {
        let duty = DUTY_TABLE[usize::from(self.duty_index & 3)][usize::from(self.sequence_phase)];
        if !self.length.is_active() || self.timer_period < 8 || self.silenced || duty == 0 {
            0
        } else {
            self.envelope.volume()
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub fn duty_index(&self) -> u8 {
        self.duty_index
    }

    pub fn sequence_phase(&self) -> u8 {
        self.sequence_phase
    }

    pub fn timer_period(&self) -> u16 {
        self.timer_period
    }

    pub fn is_silenced(&self) -> bool {
        self.silenced
    }

    /// Where the sweep would move the period on its next expiry.
    pub fn sweep_target(&self) -> i32 {
        self.sweep.target(self.timer_period)
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn length(&self) -> &LengthCounter {
        &self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_ir::registers::PULSE1_BASE;

    struct Rig {
        bus: RegisterBus<Listener>,
        pulse: Pulse,
    }

    impl Rig {
        fn new() -> Self {
            let mut bus = RegisterBus::new();
            let mut pulse = Pulse::new(PULSE1_BASE, NegateMode::OnesComplement);
            pulse.attach(&mut bus, ChannelId::Pulse1);
            pulse.set_enabled(true);
            Self { bus, pulse }
        }

        fn write(&mut self, addr: u16, value: u8) {
            for listener in self.bus.write(addr, value) {
                match listener {
                    Listener::Write(_) => self.pulse.on_register_write(&self.bus, addr, value),
                    Listener::Period(_) => self.pulse.on_period_change(&self.bus),
                    Listener::Status => {}
                }
            }
        }
    }

    #[test]
    fn register_fields_decode() {
        let mut rig = Rig::new();
        rig.write(0x4000, 0b1011_0111);
        rig.write(0x4002, 0x34);
        rig.write(0x4003, 0b0000_1010);
        assert_eq!(rig.pulse.duty_index(), 2);
        assert_eq!(rig.pulse.timer_period(), 0x234);
        assert_eq!(rig.pulse.envelope().volume(), 7);
    }

    #[test]
    fn timer_advances_phase_every_period_plus_one() {
        let mut rig = Rig::new();
        rig.write(0x4002, 10);
        rig.write(0x4003, 0);
        assert_eq!(rig.pulse.sequence_phase(), 0);

        // Counter starts at zero: first clock advances immediately
        rig.pulse.clock_timer();
        assert_eq!(rig.pulse.sequence_phase(), 1);
        for _ in 0..11 {
            rig.pulse.clock_timer();
        }
        assert_eq!(rig.pulse.sequence_phase(), 2);
    }

    #[test]
    fn amplitude_follows_duty_and_envelope() {
        let mut rig = Rig::new();
        // 50% duty, constant volume 9, halt
        rig.write(0x4000, 0b1011_1001);
        rig.write(0x4002, 0x00);
        rig.write(0x4003, 0x09);
        rig.pulse.clock_frame(false);

        let mut levels = [0u8; 8];
        for level in &mut levels {
            *level = rig.pulse.amplitude();
            for _ in 0..=0x100 {
                rig.pulse.clock_timer();
            }
        }
        assert_eq!(levels, [0, 9, 9, 9, 9, 0, 0, 0]);
    }

    #[test]
    fn short_period_is_silent() {
        let mut rig = Rig::new();
        rig.write(0x4000, 0b1011_1111);
        rig.write(0x4002, 7);
        rig.write(0x4003, 0x08);
        rig.pulse.clock_frame(false);
        for _ in 0..16 {
            rig.pulse.clock_timer();
            assert_eq!(rig.pulse.amplitude(), 0);
        }
    }

    #[test]
    fn sweep_silence_cleared_by_period_write() {
        let mut rig = Rig::new();
        rig.write(0x4000, 0b1011_1111);
        rig.write(0x4002, 0x00);
        rig.write(0x4003, 0x0F);
        // Enabled, period 0, negate, shift 0: target is -1
        rig.write(0x4001, 0b1000_1000);
        assert_eq!(rig.pulse.sweep_target(), -1);

        rig.pulse.clock_frame(true);
        assert!(rig.pulse.is_silenced());

        // Sweep reload doesn't clear it
        rig.write(0x4001, 0);
        assert!(rig.pulse.is_silenced());

        rig.write(0x4002, 0x00);
        assert!(!rig.pulse.is_silenced());
    }

    #[test]
    fn sweep_retune_is_reported() {
        let mut rig = Rig::new();
        rig.write(0x4002, 0x00);
        rig.write(0x4003, 0x01);
        // Enabled, period 0, add, shift 1
        rig.write(0x4001, 0b1000_0001);
        assert_eq!(rig.pulse.clock_frame(true), Some(0x180));
        assert_eq!(rig.pulse.clock_frame(false), None);
    }
}
