//! Noise channel.

use ns_ir::registers::NOISE_BASE;
use ns_ir::{RegisterBus, RegisterView, Region};

use crate::channel::{ChannelId, Listener};
use crate::divider::Divider;
use crate::envelope::Envelope;
use crate::length_counter::LengthCounter;
use crate::lfsr::{NoiseLfsr, NoiseMode};

/// Timer periods in CPU cycles, indexed by the 4-bit rate.
pub const NOISE_PERIODS_NTSC: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];
pub const NOISE_PERIODS_PAL: [u16; 16] = [
    4, 8, 14, 30, 60, 88, 118, 148, 188, 236, 354, 472, 708, 944, 1890, 3778,
];

const CONTROL: u16 = NOISE_BASE;
const RATE: u16 = NOISE_BASE + 2;
const LENGTH: u16 = NOISE_BASE + 3;

#[derive(Clone, Copy, Debug)]
struct NoiseFields {
    volume: RegisterView,
    constant: RegisterView,
    halt: RegisterView,
    rate: RegisterView,
    mode: RegisterView,
    length_index: RegisterView,
}

#[derive(Clone, Debug)]
pub struct Noise {
    fields: NoiseFields,
    periods: &'static [u16; 16],
    envelope: Envelope,
    length: LengthCounter,
    lfsr: NoiseLfsr,
    timer: Divider,
}

impl Noise {
    pub fn new(region: Region) -> Self {
        let periods = match region {
            Region::Ntsc => &NOISE_PERIODS_NTSC,
            Region::Pal => &NOISE_PERIODS_PAL,
        };
        Self {
            fields: NoiseFields {
                volume: RegisterView::new(CONTROL, 0, 4),
                constant: RegisterView::new(CONTROL, 4, 1),
                halt: RegisterView::new(CONTROL, 5, 1),
                rate: RegisterView::new(RATE, 0, 4),
                mode: RegisterView::new(RATE, 7, 1),
                length_index: RegisterView::new(LENGTH, 3, 5),
            },
            periods,
            envelope: Envelope::new(),
            length: LengthCounter::new(),
            lfsr: NoiseLfsr::new(),
            timer: Divider::new(apu_period(periods[0])),
        }
    }

    pub fn attach(&self, bus: &mut RegisterBus<Listener>, id: ChannelId) {
        for addr in [CONTROL, RATE, LENGTH] {
            bus.on_write(addr, Listener::Write(id));
        }
    }

    pub fn on_register_write(&mut self, bus: &RegisterBus<Listener>, addr: u16, value: u8) {
        log::trace!("noise ${addr:04X} <- ${value:02X}");
        let f = self.fields;
        match addr {
            CONTROL => {
                let halt = bus.get(f.halt) != 0;
                self.envelope.configure(bus.get(f.volume) as u8, bus.get(f.constant) != 0, halt);
                self.length.set_halt(halt);
            }
            RATE => {
                let rate = bus.get(f.rate) as usize;
                self.timer.period = apu_period(self.periods[rate]);
                self.lfsr.set_mode(if bus.get(f.mode) != 0 {
                    NoiseMode::Short
                } else {
                    NoiseMode::Long
                });
            }
            LENGTH => {
                self.length.request_load(bus.get(f.length_index) as u8);
                self.envelope.restart();
            }
            _ => {}
        }
    }

    /// APU-rate clock (every other master cycle).
    pub fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.lfsr.clock();
        }
    }

    pub fn clock_frame(&mut self, half_frame: bool) {
        self.envelope.clock();
        if half_frame {
            self.length.clock();
        }
        self.length.apply_pending();
    }

    pub fn amplitude(&self) -> u8 {
        if !self.length.is_active() || self.lfsr.muted() {
            0
        } else {
            self.envelope.volume()
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    /// Divider period in APU cycles.
    pub fn timer_period(&self) -> u16 {
        self.timer.period
    }

    pub fn lfsr(&self) -> &NoiseLfsr {
        &self.lfsr
    }

    pub fn length(&self) -> &LengthCounter {
        &self.length
    }
}

/// The table counts CPU cycles; the timer is clocked every other one.
fn apu_period(cpu_cycles: u16) -> u16 {
    (cpu_cycles / 2).saturating_sub(1)
}
