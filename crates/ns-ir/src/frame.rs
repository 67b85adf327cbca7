//! Audio frame type.

/// A stereo audio frame (32-bit float, nominally -1.0..=1.0).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    /// Convert to a clamped 16-bit PCM pair.
    pub fn to_pcm16(self) -> (i16, i16) {
        (to_i16(self.left), to_i16(self.right))
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_duplicates() {
        let f = Frame::mono(0.25);
        assert_eq!(f.left, 0.25);
        assert_eq!(f.right, 0.25);
        assert_eq!(Frame::silence(), Frame::default());
    }

    #[test]
    fn pcm16_clamps() {
        assert_eq!(Frame::mono(2.0).to_pcm16(), (32767, 32767));
        assert_eq!(Frame::mono(-2.0).to_pcm16(), (-32767, -32767));
        assert_eq!(Frame::silence().to_pcm16(), (0, 0));
    }
}
