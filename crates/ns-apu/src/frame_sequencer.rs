//! 4-step frame sequencer.

/// Master cycles per sequence (14915 APU cycles).
pub const FRAME_PERIOD: u32 = 29_830;

/// Master cycle of each quarter-frame clock within the sequence.
pub const QUARTER_FRAMES: [u32; 4] = [7_457, 14_913, 22_371, 29_829];

/// A quarter-frame clock emitted by the sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameClock {
    /// Step within the sequence, 0-3.
    pub step: u8,
    /// Steps 1 and 3 also clock length counters and sweeps.
    pub half: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSequencer {
    cycle: u32,
}

impl FrameSequencer {
    pub const fn new() -> Self {
        Self { cycle: 0 }
    }

    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Advance one master cycle.
    pub fn clock(&mut self) -> Option<FrameClock> {
        self.cycle += 1;
        if self.cycle >= FRAME_PERIOD {
            self.cycle = 0;
        }
        let step = QUARTER_FRAMES.iter().position(|&c| c == self.cycle)?;
        let frame = FrameClock {
            step: step as u8,
            half: step % 2 == 1,
        };
        log::trace!("frame step {} (half: {})", frame.step, frame.half);
        Some(frame)
    }
}
