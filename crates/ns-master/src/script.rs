//! Timestamped register writes standing in for the CPU.

use ns_ir::registers::{NOISE_BASE, PULSE1_BASE, PULSE2_BASE, STATUS, TRIANGLE_BASE};
use ns_ir::Region;

/// A single CPU store at a master-clock cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterWrite {
    pub cycle: u64,
    pub addr: u16,
    pub value: u8,
}

/// Register writes sorted by cycle. Writes at the same cycle keep their
/// insertion order.
#[derive(Clone, Debug, Default)]
pub struct RegisterScript {
    writes: Vec<RegisterWrite>,
    /// Playback continues to at least this cycle after the last write.
    length: u64,
}

impl RegisterScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cycle: u64, addr: u16, value: u8) {
        let pos = self.writes.partition_point(|w| w.cycle <= cycle);
        self.writes.insert(pos, RegisterWrite { cycle, addr, value });
    }

    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    pub fn get(&self, index: usize) -> Option<&RegisterWrite> {
        self.writes.get(index)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Run for at least `cycles` master cycles.
    pub fn set_length(&mut self, cycles: u64) {
        self.length = cycles;
    }

    /// Cycle at which the script is exhausted.
    pub fn end_cycle(&self) -> u64 {
        let last = self.writes.last().map_or(0, |w| w.cycle + 1);
        last.max(self.length)
    }
}

const BEAT_SECONDS: f64 = 0.25;

const MELODY: [f64; 16] = [
    523.25, 659.25, 783.99, 1046.50, 783.99, 659.25, 523.25, 392.00,
    440.00, 523.25, 659.25, 880.00, 659.25, 523.25, 493.88, 523.25,
];
const HARMONY: [f64; 16] = [
    261.63, 329.63, 392.00, 523.25, 392.00, 329.63, 261.63, 196.00,
    220.00, 261.63, 329.63, 440.00, 329.63, 261.63, 246.94, 261.63,
];
const BASS: [f64; 4] = [130.81, 174.61, 110.00, 130.81];

/// A four-bar loop exercising every channel: arpeggio on pulse 1, a lower
/// voice on pulse 2, a triangle bass line and noise percussion.
pub fn demo_script(region: Region) -> RegisterScript {
    let clock = f64::from(region.cpu_clock_hz());
    let beat = region.cycles_in(BEAT_SECONDS);
    let mut script = RegisterScript::new();

    script.push(0, STATUS, 0x0F);
    // Pulse 1: 50% duty, halted length, constant volume 8
    script.push(0, PULSE1_BASE, 0b1011_1000);
    script.push(0, PULSE1_BASE + 1, 0x00);
    // Pulse 2: 25% duty, constant volume 5
    script.push(0, PULSE2_BASE, 0b0111_0101);
    script.push(0, PULSE2_BASE + 1, 0x00);
    // Triangle: control set, linear counter held
    script.push(0, TRIANGLE_BASE, 0xFF);
    // Noise: decaying envelope, rate 4
    script.push(0, NOISE_BASE, 0x02);
    script.push(0, NOISE_BASE + 2, 0x04);

    for (step, (&lead, &low)) in MELODY.iter().zip(HARMONY.iter()).enumerate() {
        let at = step as u64 * beat;
        pulse_note(&mut script, at, PULSE1_BASE, pulse_period(clock, lead));
        pulse_note(&mut script, at, PULSE2_BASE, pulse_period(clock, low));
        if step % 4 == 0 {
            let period = triangle_period(clock, BASS[step / 4]);
            script.push(at, TRIANGLE_BASE + 2, period as u8);
            script.push(at, TRIANGLE_BASE + 3, 0x08 | (period >> 8) as u8);
        }
        // Kick on even beats, short-mode hat on odd ones
        let (mode_rate, length) = if step % 2 == 0 { (0x0A, 0x10) } else { (0x83, 0x28) };
        script.push(at, NOISE_BASE + 2, mode_rate);
        script.push(at, NOISE_BASE + 3, length);
    }

    let end = MELODY.len() as u64 * beat;
    script.push(end, STATUS, 0x00);
    script.set_length(end + beat);
    script
}

fn pulse_note(script: &mut RegisterScript, cycle: u64, base: u16, period: u16) {
    script.push(cycle, base + 2, period as u8);
    script.push(cycle, base + 3, 0x08 | (period >> 8) as u8);
}

/// Timer period for a pulse tone at `freq` Hz.
pub fn pulse_period(clock: f64, freq: f64) -> u16 {
    let period = (clock / (16.0 * freq)).round() - 1.0;
    period.clamp(8.0, 2047.0) as u16
}

/// Timer period for a triangle tone at `freq` Hz.
pub fn triangle_period(clock: f64, freq: f64) -> u16 {
    let period = (clock / (32.0 * freq)).round() - 1.0;
    period.clamp(0.0, 2047.0) as u16
}
