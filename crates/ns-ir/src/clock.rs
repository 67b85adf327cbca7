//! Console region and master cycle clock.

/// Console timing region.
///
/// Only the CPU clock rate and the noise period table differ between
/// regions; the frame sequencer always runs the NTSC 4-step sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

impl Region {
    /// CPU clock rate in Hz.
    pub const fn cpu_clock_hz(self) -> u32 {
        match self {
            Region::Ntsc => 1_789_773,
            Region::Pal => 1_662_607,
        }
    }

    /// Duration of one master cycle in seconds.
    pub fn cycle_seconds(self) -> f64 {
        1.0 / self.cpu_clock_hz() as f64
    }

    /// Number of whole master cycles in `seconds`.
    pub fn cycles_in(self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.cpu_clock_hz() as f64) as u64
    }
}

/// Anything that reports a monotonic emulated time in seconds.
pub trait TimeSource {
    fn current_time(&self) -> f64;
}

/// Counts master (CPU) cycles since power-on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MasterClock {
    cycles: u64,
    region: Region,
}

impl MasterClock {
    pub const fn new(region: Region) -> Self {
        Self { cycles: 0, region }
    }

    pub const fn region(&self) -> Region {
        self.region
    }

    /// Cycles elapsed since power-on.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Advance by one master cycle.
    pub fn tick(&mut self) {
        self.cycles += 1;
    }

    /// Advance by `cycles` master cycles.
    pub fn advance(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    /// Elapsed time in seconds.
    pub fn seconds(&self) -> f64 {
        self.cycles as f64 / self.region.cpu_clock_hz() as f64
    }

    pub fn reset(&mut self) {
        self.cycles = 0;
    }
}

impl TimeSource for MasterClock {
    fn current_time(&self) -> f64 {
        self.seconds()
    }
}
