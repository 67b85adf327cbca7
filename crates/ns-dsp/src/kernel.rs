//! Band-limited step response table and its construction errors.
//!
//! A step in the output level is rendered as the integral of a windowed
//! sinc (Lanczos) kernel rather than an instantaneous jump. The table holds
//! that integral, differenced into per-sample increments, for a set of
//! sub-sample phase offsets; convolving step events against it yields the
//! per-sample change of the band-limited signal.

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::PI;
use core::fmt;

use crate::special::si;

/// Rejected kernel parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// The Lanczos window needs at least two samples either side.
    RadiusTooSmall(usize),
    /// Phase count must be a positive even number.
    InvalidPhaseCount(usize),
    /// A resampler needs a non-zero output rate.
    ZeroSampleRate,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::RadiusTooSmall(r) => write!(f, "kernel radius {} is below 2", r),
            KernelError::InvalidPhaseCount(n) => {
                write!(f, "phase count {} must be positive and even", n)
            }
            KernelError::ZeroSampleRate => write!(f, "output sample rate must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KernelError {}

/// Immutable step-response table, shared read-only between resamplers.
#[derive(Clone, Debug, PartialEq)]
pub struct StepKernel {
    /// Row `k` is the response to a step `k / phase_count` of a sample
    /// after the sample centre, for `k` in `0..=phase_count / 2`.
    rows: Vec<Vec<f64>>,
    radius: usize,
    phase_count: usize,
}

impl StepKernel {
    /// Wrap a precomputed table.
    ///
    /// # Panics
    ///
    /// Panics if the table is empty, its rows differ in length, or the row
    /// length is odd or zero.
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        assert!(!rows.is_empty(), "step kernel table has no rows");
        let width = rows[0].len();
        assert!(width > 0 && width % 2 == 0, "step kernel rows must have even, non-zero length");
        assert!(
            rows.iter().all(|row| row.len() == width),
            "step kernel table is not rectangular"
        );
        let phase_count = 2 * (rows.len() - 1);
        Self {
            radius: width / 2,
            phase_count: phase_count.max(1),
            rows,
        }
    }

    /// Build the Lanczos step response for `radius` samples either side and
    /// `phase_count` sub-sample phases.
    pub fn lanczos(radius: usize, phase_count: usize) -> Result<Self, KernelError> {
        if radius < 2 {
            return Err(KernelError::RadiusTooSmall(radius));
        }
        if phase_count == 0 || phase_count % 2 != 0 {
            return Err(KernelError::InvalidPhaseCount(phase_count));
        }

        let step = LanczosStep::new(radius as f64 - 0.5);
        let rows = (0..=phase_count / 2)
            .map(|k| {
                let frac = k as f64 / phase_count as f64;
                let levels: Vec<f64> = (0..=2 * radius)
                    .map(|j| step.value(j as f64 - radius as f64 - frac))
                    .collect();
                levels.windows(2).map(|w| w[1] - w[0]).collect()
            })
            .collect();

        Ok(Self {
            rows,
            radius,
            phase_count,
        })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    /// Row for a signed phase; negative phases mirror the positive row.
    pub fn row(&self, phase: i64) -> impl Iterator<Item = f64> + '_ {
        let row = &self.rows[(phase.unsigned_abs() as usize).min(self.rows.len() - 1)];
        let mirrored = phase < 0;
        (0..row.len()).map(move |i| if mirrored { row[row.len() - 1 - i] } else { row[i] })
    }

    /// Per-sample output deltas for samples `start..end` produced by the
    /// `(position, delta)` step events, positions in samples.
    pub fn convolve(&self, start: i64, end: i64, events: &[(f64, f64)]) -> Vec<f64> {
        let mut out = vec![0.0; (end - start).max(0) as usize];
        self.convolve_into(start, &mut out, events);
        out
    }

    /// Accumulate into `out`, which covers samples `start..start + out.len()`.
    pub fn convolve_into(&self, start: i64, out: &mut [f64], events: &[(f64, f64)]) {
        let len = out.len() as i64;
        for &(position, delta) in events {
            let (first, phase) = self.place(position);
            let offset = first - start;
            for (i, k) in self.row(phase).enumerate() {
                let index = offset + i as i64;
                if (0..len).contains(&index) {
                    out[index as usize] += k * delta;
                }
            }
        }
    }

    /// First sample a step at `position` touches.
    pub fn support_start(&self, position: f64) -> i64 {
        self.place(position).0
    }

    /// Share of a unit step at `position` that lands on samples before `end`.
    pub fn sum_before(&self, position: f64, end: i64) -> f64 {
        let (first, phase) = self.place(position);
        self.row(phase)
            .enumerate()
            .take_while(|(i, _)| first + (*i as i64) < end)
            .map(|(_, k)| k)
            .sum()
    }

    /// First touched sample and row phase for a step at `position`.
    fn place(&self, position: f64) -> (i64, i64) {
        let center = libm::round(position);
        let phase = libm::round((position - center) * self.phase_count as f64) as i64;
        (center as i64 - self.radius as i64, phase)
    }
}

/// Normalised integral of the Lanczos kernel of order `a`.
struct LanczosStep {
    a: f64,
    /// `F(a) - F(-a)`: total area under the kernel.
    area: f64,
}

impl LanczosStep {
    fn new(a: f64) -> Self {
        let half = Self::antiderivative(a, a);
        Self { a, area: 2.0 * half }
    }

    /// Closed-form `∫₀ˣ sinc(t) sinc(t/a) dt`.
    fn antiderivative(x: f64, a: f64) -> f64 {
        if x == 0.0 {
            return 0.0;
        }
        let m = (a - 1.0) * PI * x;
        let p = (a + 1.0) * PI * x;
        (-m * si(m / a) + p * si(p / a) - 2.0 * a * libm::sin(PI * x) * libm::sin(PI * x / a))
            / (2.0 * PI * PI * x)
    }

    /// Step response: 0 before the window, 1 after it.
    fn value(&self, x: f64) -> f64 {
        if x >= self.a {
            1.0
        } else if x <= -self.a {
            0.0
        } else {
            Self::antiderivative(x, self.a) / self.area + 0.5
        }
    }
}
