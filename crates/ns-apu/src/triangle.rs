//! Triangle channel.

use ns_ir::registers::TRIANGLE_BASE;
use ns_ir::{RegisterBus, RegisterView};

use crate::channel::{ChannelId, Listener};
use crate::divider::Divider;
use crate::length_counter::LengthCounter;
use crate::linear_counter::LinearCounter;

/// 32-step output sequence: 15 down to 0, then 0 up to 15.
pub const TRIANGLE_TABLE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, //
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

const CONTROL: u16 = TRIANGLE_BASE;
const LENGTH: u16 = TRIANGLE_BASE + 3;

#[derive(Clone, Copy, Debug)]
struct TriangleFields {
    linear_reload: RegisterView,
    control: RegisterView,
    period: RegisterView,
    length_index: RegisterView,
}

/// The triangle channel. Its timer runs at the CPU rate.
#[derive(Clone, Debug)]
pub struct Triangle {
    fields: TriangleFields,
    sequence_phase: u8,
    linear: LinearCounter,
    length: LengthCounter,
    timer_period: u16,
    timer: Divider,
}

impl Triangle {
    pub fn new() -> Self {
        Self {
            fields: TriangleFields {
                linear_reload: RegisterView::new(TRIANGLE_BASE, 0, 7),
                control: RegisterView::new(TRIANGLE_BASE, 7, 1),
                period: RegisterView::new(TRIANGLE_BASE, 16, 11),
                length_index: RegisterView::new(TRIANGLE_BASE, 27, 5),
            },
            sequence_phase: 0,
            linear: LinearCounter::new(),
            length: LengthCounter::new(),
            timer_period: 0,
            timer: Divider::new(0),
        }
    }

    pub fn attach(&self, bus: &mut RegisterBus<Listener>, id: ChannelId) {
        bus.on_write(CONTROL, Listener::Write(id));
        bus.on_write(LENGTH, Listener::Write(id));
        bus.watch(self.fields.period, Listener::Period(id));
    }

    pub fn period_view(&self) -> RegisterView {
        self.fields.period
    }

    pub fn on_register_write(&mut self, bus: &RegisterBus<Listener>, addr: u16, value: u8) {
        log::trace!("triangle ${addr:04X} <- ${value:02X}");
        let f = self.fields;
        match addr {
            CONTROL => {
                let control = bus.get(f.control) != 0;
                self.linear.configure(control, bus.get(f.linear_reload) as u8);
                self.length.set_halt(control);
            }
            LENGTH => {
                self.length.request_load(bus.get(f.length_index) as u8);
                self.linear.request_reload();
            }
            _ => {}
        }
    }

    pub fn on_period_change(&mut self, bus: &RegisterBus<Listener>) {
        self.timer_period = bus.get(self.fields.period) as u16;
        self.timer.period = self.timer_period;
    }

    pub fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.sequence_phase = (self.sequence_phase + 1) % 32;
        }
    }

    pub fn clock_frame(&mut self, half_frame: bool) {
        self.linear.clock();
        if half_frame {
            self.length.clock();
        }
        self.length.apply_pending();
    }

    pub fn amplitude(&self) -> u8 {
        if self.length.is_active() && self.linear.is_active() {
            TRIANGLE_TABLE[usize::from(self.sequence_phase)]
        } else {
            0
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub fn sequence_phase(&self) -> u8 {
        self.sequence_phase
    }

    pub fn timer_period(&self) -> u16 {
        self.timer_period
    }

    pub fn linear(&self) -> &LinearCounter {
        &self.linear
    }

    pub fn length(&self) -> &LengthCounter {
        &self.length
    }
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new()
    }
}
