//! The APU: register bus, channels, sequencer and mixer behind one facade.

use alloc::vec::Vec;
use ns_ir::registers::{PULSE1_BASE, PULSE2_BASE, STATUS};
use ns_ir::{MasterClock, RegisterBus, RegisterObserver, Region, StepEvent, TimeSource};

use crate::channel::{ChannelId, ChannelState, Listener};
use crate::frame_sequencer::FrameSequencer;
use crate::mixer;
use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::step_stream::StepStream;
use crate::sweep::NegateMode;
use crate::triangle::Triangle;

/// Step events reserved per drain cycle by [`Apu::new`].
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Audio processing unit driven one master cycle at a time.
///
/// The CPU side stores bytes with [`write_register`](Self::write_register)
/// and ticks [`advance_one_master_cycle`](Self::advance_one_master_cycle);
/// the audio side periodically calls
/// [`drain_step_events`](Self::drain_step_events).
#[derive(Clone, Debug)]
pub struct Apu {
    clock: MasterClock,
    bus: RegisterBus<Listener>,
    channels: [ChannelState; 4],
    sequencer: FrameSequencer,
    stream: StepStream,
    /// Last levels fed to the mixer, per channel.
    levels: [u8; 4],
    muted: [bool; 4],
    /// Pulse and noise timers run on every other master cycle.
    apu_cycle: bool,
}

impl Apu {
    pub fn new(region: Region) -> Self {
        Self::with_event_capacity(region, DEFAULT_EVENT_CAPACITY)
    }

    /// Power-on state with room for `capacity` step events between drains.
    pub fn with_event_capacity(region: Region, capacity: usize) -> Self {
        let channels = [
            ChannelState::Pulse(Pulse::new(PULSE1_BASE, NegateMode::OnesComplement)),
            ChannelState::Pulse(Pulse::new(PULSE2_BASE, NegateMode::TwosComplement)),
            ChannelState::Triangle(Triangle::new()),
            ChannelState::Noise(Noise::new(region)),
        ];
        let mut bus = RegisterBus::new();
        for id in ChannelId::ALL {
            channels[id.index()].attach(&mut bus, id);
        }
        bus.on_write(STATUS, Listener::Status);

        Self {
            clock: MasterClock::new(region),
            bus,
            channels,
            sequencer: FrameSequencer::new(),
            stream: StepStream::with_capacity(capacity),
            levels: [0; 4],
            muted: [false; 4],
            apu_cycle: false,
        }
    }

    pub fn region(&self) -> Region {
        self.clock.region()
    }

    /// Master cycles since power-on.
    pub fn cycles(&self) -> u64 {
        self.clock.cycles()
    }

    /// Emulated time in seconds.
    pub fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    /// CPU store to an APU register. Addresses outside `$4000-$4017` are
    /// ignored.
    pub fn write_register(&mut self, addr: u16, value: u8) {
        let mut channels = Dispatch(&mut self.channels);
        self.bus.store(addr, value, &mut channels);
    }

    /// Last byte stored at `addr`.
    pub fn read_register(&self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    /// Length counter status, as read from `$4015`.
    pub fn status(&self) -> u8 {
        ChannelId::ALL
            .iter()
            .filter(|id| self.channels[id.index()].length_active())
            .fold(0, |bits, id| bits | id.status_bit())
    }

    pub fn advance_one_master_cycle(&mut self) {
        self.clock.tick();
        if let Some(frame) = self.sequencer.clock() {
            self.clock_frame(frame.half);
        }

        self.channels[ChannelId::Triangle.index()].clock_timer();
        self.apu_cycle = !self.apu_cycle;
        if self.apu_cycle {
            for id in [ChannelId::Pulse1, ChannelId::Pulse2, ChannelId::Noise] {
                self.channels[id.index()].clock_timer();
            }
        }

        self.refresh_output();
    }

    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.advance_one_master_cycle();
        }
    }

    /// Step events since the last drain, followed by one event carrying
    /// the current level at the current time.
    pub fn drain_step_events(&mut self) -> Vec<StepEvent> {
        self.stream.drain(self.clock.seconds())
    }

    /// Current mixed output level.
    pub fn output(&self) -> f64 {
        self.stream.last_amplitude()
    }

    /// Per-channel levels currently feeding the mixer.
    pub fn levels(&self) -> [u8; 4] {
        self.levels
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelState {
        &self.channels[id.index()]
    }

    /// Keep a channel running but drop it from the mix.
    pub fn set_channel_muted(&mut self, id: ChannelId, muted: bool) {
        self.muted[id.index()] = muted;
    }

    pub fn is_channel_muted(&self, id: ChannelId) -> bool {
        self.muted[id.index()]
    }

    fn clock_frame(&mut self, half: bool) {
        for id in ChannelId::ALL {
            let channel = &mut self.channels[id.index()];
            let Some(period) = channel.clock_frame(half) else {
                continue;
            };
            if let Some(view) = channel.period_view() {
                let mut channels = Dispatch(&mut self.channels);
                self.bus.update(view, u32::from(period), &mut channels);
            }
        }
    }

    fn refresh_output(&mut self) {
        let mut levels = [0u8; 4];
        for id in ChannelId::ALL {
            let i = id.index();
            if !self.muted[i] {
                levels[i] = self.channels[i].amplitude();
            }
        }
        if levels != self.levels {
            self.levels = levels;
            let level = mixer::mix(levels[0], levels[1], levels[2], levels[3]);
            self.stream.record(self.clock.seconds(), level);
        }
    }
}

/// Routes register bus notifications to the channels.
struct Dispatch<'a>(&'a mut [ChannelState; 4]);

impl RegisterObserver<Listener> for Dispatch<'_> {
    fn notify(&mut self, key: Listener, bus: &RegisterBus<Listener>, addr: u16) {
        match key {
            Listener::Write(id) => self.0[id.index()].on_register_write(bus, addr, bus.read(addr)),
            Listener::Period(id) => self.0[id.index()].on_period_change(bus),
            Listener::Status => {
                let status = bus.read(STATUS);
                log::trace!("status <- ${status:02X}");
                for id in ChannelId::ALL {
                    self.0[id.index()].set_enabled(status & id.status_bit() != 0);
                }
            }
        }
    }
}

impl TimeSource for Apu {
    fn current_time(&self) -> f64 {
        self.clock.seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_sequencer::QUARTER_FRAMES;

    fn pulse(apu: &Apu) -> &Pulse {
        apu.channel(ChannelId::Pulse1).as_pulse().unwrap()
    }

    #[test]
    fn power_on_is_silent() {
        let mut apu = Apu::new(Region::Ntsc);
        apu.run_cycles(40_000);
        assert_eq!(apu.levels(), [0; 4]);
        assert_eq!(apu.drain_step_events(), vec![StepEvent::new(apu.current_time(), 0.0)]);
    }

    #[test]
    fn status_write_enables_and_clears() {
        let mut apu = Apu::new(Region::Ntsc);
        apu.write_register(0x4015, 0x0F);
        apu.write_register(0x4003, 0x08);
        apu.write_register(0x400F, 0x08);
        apu.run_cycles(u64::from(QUARTER_FRAMES[0]));
        assert_eq!(apu.status(), 0b1001);

        apu.write_register(0x4015, 0x08);
        assert_eq!(apu.status(), 0b1000);
    }

    #[test]
    fn sweep_retune_reaches_registers() {
        let mut apu = Apu::new(Region::Ntsc);
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0x3F);
        apu.write_register(0x4002, 0x00);
        apu.write_register(0x4003, 0x01);
        // Enabled, divider period 0, subtract, shift 2
        apu.write_register(0x4001, 0b1000_1010);
        assert_eq!(pulse(&apu).timer_period(), 0x100);

        // First half frame: 0x100 - 0x40 - 1
        apu.run_cycles(u64::from(QUARTER_FRAMES[1]));
        assert_eq!(pulse(&apu).timer_period(), 0xBF);
        assert_eq!(apu.read_register(0x4002), 0xBF);
        assert_eq!(apu.read_register(0x4003) & 0x07, 0);
    }

    #[test]
    fn muted_channel_leaves_the_mix() {
        let mut apu = Apu::new(Region::Ntsc);
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0xBF);
        apu.write_register(0x4002, 0x40);
        apu.write_register(0x4003, 0x08);
        apu.run_cycles(10_000);
        assert!(apu.drain_step_events().len() > 1);

        apu.set_channel_muted(ChannelId::Pulse1, true);
        apu.run_cycles(2);
        assert_eq!(apu.levels(), [0; 4]);
        assert_eq!(apu.output(), 0.0);
        apu.drain_step_events();
        apu.run_cycles(10_000);
        assert_eq!(apu.drain_step_events().len(), 1);
    }

    #[test]
    fn unmapped_writes_are_ignored() {
        let mut apu = Apu::new(Region::Pal);
        apu.write_register(0x4018, 0xFF);
        apu.write_register(0x4017, 0x40);
        apu.run_cycles(100);
        assert_eq!(apu.read_register(0x4018), 0);
        assert_eq!(apu.region(), Region::Pal);
    }
}
