//! Nonlinear channel mixer.
//!
//! Pulse channels share one resistor network and the triangle, noise and
//! DMC channels another; each network saturates, so the combined output
//! is not a plain sum.

/// Pulse network output for two 0-15 levels.
pub fn pulse_out(pulse1: u8, pulse2: u8) -> f64 {
    let sum = f64::from(pulse1) + f64::from(pulse2);
    if sum == 0.0 {
        0.0
    } else {
        95.88 / (8128.0 / sum + 100.0)
    }
}

/// Triangle/noise/DMC network output. DMC is a 7-bit level.
pub fn tnd_out(triangle: u8, noise: u8, dmc: u8) -> f64 {
    let tnd = f64::from(triangle) / 8227.0 + f64::from(noise) / 12241.0 + f64::from(dmc) / 22638.0;
    if tnd == 0.0 {
        0.0
    } else {
        159.79 / (1.0 / tnd + 100.0)
    }
}

/// Mixed output level. The DMC contributes nothing, which keeps the
/// result within 0.0..0.64.
pub fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8) -> f64 {
    pulse_out(pulse1, pulse2) + tnd_out(triangle, noise, 0)
}
