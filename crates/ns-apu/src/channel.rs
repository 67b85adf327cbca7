//! Channel identities, register listener keys and the channel sum type.

use ns_ir::{RegisterBus, RegisterView};

use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::triangle::Triangle;

/// The four tone generators, in status-register bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Pulse1 = 0,
    Pulse2 = 1,
    Triangle = 2,
    Noise = 3,
}

impl ChannelId {
    pub const ALL: [ChannelId; 4] = [
        ChannelId::Pulse1,
        ChannelId::Pulse2,
        ChannelId::Triangle,
        ChannelId::Noise,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Enable bit in `$4015`.
    pub const fn status_bit(self) -> u8 {
        1 << self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChannelId::Pulse1 => "pulse1",
            ChannelId::Pulse2 => "pulse2",
            ChannelId::Triangle => "triangle",
            ChannelId::Noise => "noise",
        }
    }
}

/// Register bus listener key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listener {
    /// CPU store to one of the channel's registers.
    Write(ChannelId),
    /// The channel's timer period bits changed.
    Period(ChannelId),
    /// Store to the `$4015` status register.
    Status,
}

/// A channel state machine.
#[derive(Clone, Debug)]
pub enum ChannelState {
    Pulse(Pulse),
    Triangle(Triangle),
    Noise(Noise),
}

impl ChannelState {
    pub fn attach(&self, bus: &mut RegisterBus<Listener>, id: ChannelId) {
        match self {
            ChannelState::Pulse(p) => p.attach(bus, id),
            ChannelState::Triangle(t) => t.attach(bus, id),
            ChannelState::Noise(n) => n.attach(bus, id),
        }
    }

    pub fn on_register_write(&mut self, bus: &RegisterBus<Listener>, addr: u16, value: u8) {
        match self {
            ChannelState::Pulse(p) => p.on_register_write(bus, addr, value),
            ChannelState::Triangle(t) => t.on_register_write(bus, addr, value),
            ChannelState::Noise(n) => n.on_register_write(bus, addr, value),
        }
    }

    pub fn on_period_change(&mut self, bus: &RegisterBus<Listener>) {
        match self {
            ChannelState::Pulse(p) => p.on_period_change(bus),
            ChannelState::Triangle(t) => t.on_period_change(bus),
            ChannelState::Noise(_) => {}
        }
    }

    /// The 11-bit timer period field, for channels that have one.
    pub fn period_view(&self) -> Option<RegisterView> {
        match self {
            ChannelState::Pulse(p) => Some(p.period_view()),
            ChannelState::Triangle(t) => Some(t.period_view()),
            ChannelState::Noise(_) => None,
        }
    }

    pub fn clock_timer(&mut self) {
        match self {
            ChannelState::Pulse(p) => p.clock_timer(),
            ChannelState::Triangle(t) => t.clock_timer(),
            ChannelState::Noise(n) => n.clock_timer(),
        }
    }

    /// Quarter-frame clock; returns a sweep retune for pulse channels.
    pub fn clock_frame(&mut self, half_frame: bool) -> Option<u16> {
        match self {
            ChannelState::Pulse(p) => p.clock_frame(half_frame),
            ChannelState::Triangle(t) => {
                t.clock_frame(half_frame);
                None
            }
            ChannelState::Noise(n) => {
                n.clock_frame(half_frame);
                None
            }
        }
    }

    pub fn amplitude(&self) -> u8 {
        match self {
            ChannelState::Pulse(p) => p.amplitude(),
            ChannelState::Triangle(t) => t.amplitude(),
            ChannelState::Noise(n) => n.amplitude(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match self {
            ChannelState::Pulse(p) => p.set_enabled(enabled),
            ChannelState::Triangle(t) => t.set_enabled(enabled),
            ChannelState::Noise(n) => n.set_enabled(enabled),
        }
    }

    /// Length counter still running (the `$4015` read bit).
    pub fn length_active(&self) -> bool {
        match self {
            ChannelState::Pulse(p) => p.length().is_active(),
            ChannelState::Triangle(t) => t.length().is_active(),
            ChannelState::Noise(n) => n.length().is_active(),
        }
    }

    pub fn as_pulse(&self) -> Option<&Pulse> {
        match self {
            ChannelState::Pulse(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_triangle(&self) -> Option<&Triangle> {
        match self {
            ChannelState::Triangle(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_noise(&self) -> Option<&Noise> {
        match self {
            ChannelState::Noise(n) => Some(n),
            _ => None,
        }
    }
}
