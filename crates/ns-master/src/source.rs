//! Batch producers of APU step events.

use ns_apu::{Apu, ChannelId};
use ns_ir::{Region, StepEvent, TimeSource};

use crate::script::RegisterScript;

/// Produces step events in finite batches.
pub trait StepSource: TimeSource {
    /// Run the next `budget` seconds and return their step events. The
    /// batch ends with an event at the new current time. `None` once the
    /// source is exhausted.
    fn next_batch(&mut self, budget: f64) -> Option<Vec<StepEvent>>;

    /// Start over from power-on.
    fn rewind(&mut self);
}

/// Drives an [`Apu`] from a [`RegisterScript`].
#[derive(Clone, Debug)]
pub struct ScriptSource {
    apu: Apu,
    script: RegisterScript,
    /// Index of the next write to apply.
    cursor: usize,
}

impl ScriptSource {
    pub fn new(script: RegisterScript, region: Region) -> Self {
        Self {
            apu: Apu::new(region),
            script,
            cursor: 0,
        }
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    /// Access for muting channels between batches.
    pub fn apu_mut(&mut self) -> &mut Apu {
        &mut self.apu
    }

    pub fn script(&self) -> &RegisterScript {
        &self.script
    }

    pub fn is_finished(&self) -> bool {
        self.apu.cycles() >= self.script.end_cycle()
    }

    /// Length of the script in seconds.
    pub fn duration(&self) -> f64 {
        self.script.end_cycle() as f64 * self.apu.region().cycle_seconds()
    }

    fn apply_due_writes(&mut self) {
        let now = self.apu.cycles();
        while let Some(write) = self.script.get(self.cursor).copied() {
            if write.cycle > now {
                break;
            }
            log::trace!("cycle {}: ${:04X} <- ${:02X}", now, write.addr, write.value);
            self.apu.write_register(write.addr, write.value);
            self.cursor += 1;
        }
    }
}

impl TimeSource for ScriptSource {
    fn current_time(&self) -> f64 {
        self.apu.current_time()
    }
}

impl StepSource for ScriptSource {
    fn next_batch(&mut self, budget: f64) -> Option<Vec<StepEvent>> {
        if self.is_finished() {
            return None;
        }
        let region = self.apu.region();
        let target = (self.apu.cycles() + region.cycles_in(budget).max(1))
            .min(self.script.end_cycle());

        while self.apu.cycles() < target {
            self.apply_due_writes();
            let next = self
                .script
                .get(self.cursor)
                .map_or(target, |w| w.cycle.min(target));
            self.apu.run_cycles(next - self.apu.cycles());
        }

        let events = self.apu.drain_step_events();
        log::debug!(
            "batch to {:.4} s: {} step events",
            self.apu.current_time(),
            events.len()
        );
        Some(events)
    }

    /// Channel mutes carry over to the fresh APU.
    fn rewind(&mut self) {
        let mut apu = Apu::new(self.apu.region());
        for id in ChannelId::ALL {
            apu.set_channel_muted(id, self.apu.is_channel_muted(id));
        }
        self.apu = apu;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_ir::registers::{PULSE1_BASE, STATUS};

    fn tone_script() -> RegisterScript {
        let mut script = RegisterScript::new();
        script.push(0, STATUS, 0x01);
        script.push(0, PULSE1_BASE, 0b1011_1000);
        script.push(0, PULSE1_BASE + 2, 0xFD);
        script.push(0, PULSE1_BASE + 3, 0x08);
        script.push(20_000, STATUS, 0x00);
        script.set_length(30_000);
        script
    }

    #[test]
    fn batches_cover_the_script_then_stop() {
        let mut source = ScriptSource::new(tone_script(), Region::Ntsc);
        let mut batches = 0;
        let mut last_time = 0.0;
        while let Some(events) = source.next_batch(0.005) {
            batches += 1;
            let end = events.last().map(|e| e.time).unwrap();
            assert!(end > last_time);
            assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
            last_time = end;
        }
        assert!(source.is_finished());
        assert_eq!(source.apu().cycles(), 30_000);
        // 30000 cycles at ~8949 per 5 ms
        assert_eq!(batches, 4);
        assert!(source.next_batch(0.005).is_none());
    }

    #[test]
    fn writes_land_on_their_cycle() {
        let mut source = ScriptSource::new(tone_script(), Region::Ntsc);
        // Length loads on the first quarter frame
        source.next_batch(0.005);
        assert_eq!(source.apu().status() & 0x01, 0x01);
        while source.apu().cycles() <= 20_000 {
            source.next_batch(0.001);
        }
        assert_eq!(source.apu().read_register(STATUS), 0x00);
        assert_eq!(source.apu().status(), 0);
    }

    #[test]
    fn square_wave_toggles() {
        let mut source = ScriptSource::new(tone_script(), Region::Ntsc);
        let events = source.next_batch(0.02).unwrap();
        // Period 0xFD gives ~440 Hz, audible from the first quarter frame
        // until the status write at cycle 20000
        let rising = events.windows(2).filter(|w| w[1].amplitude > w[0].amplitude).count();
        assert!((2..=5).contains(&rising), "rising edges: {rising}");
        assert_eq!(events.last().map(|e| e.amplitude), Some(0.0));
    }

    #[test]
    fn rewind_replays_identically() {
        let mut source = ScriptSource::new(tone_script(), Region::Ntsc);
        let first = source.next_batch(0.004).unwrap();
        source.next_batch(0.004);
        source.rewind();
        assert_eq!(source.apu().cycles(), 0);
        assert_eq!(source.next_batch(0.004).unwrap(), first);
    }

    #[test]
    fn rewind_keeps_channels_muted() {
        let mut source = ScriptSource::new(tone_script(), Region::Ntsc);
        source.apu_mut().set_channel_muted(ChannelId::Pulse1, true);
        let first = source.next_batch(0.02).unwrap();
        assert!(first.iter().all(|e| e.amplitude == 0.0));

        source.rewind();
        assert!(source.apu().is_channel_muted(ChannelId::Pulse1));
        assert!(!source.apu().is_channel_muted(ChannelId::Pulse2));
        let replay = source.next_batch(0.02).unwrap();
        assert_eq!(replay, first);
        assert!(replay.iter().all(|e| e.amplitude == 0.0));
    }
}
