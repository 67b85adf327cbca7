//! Cosine and sine integrals.
//!
//! `Ci(x) = γ + ln x + ∫₀ˣ (cos t - 1)/t dt` and `Si(x) = ∫₀ˣ sin t / t dt`,
//! evaluated by power series for small arguments and by a complex
//! continued fraction (modified Lentz) for large ones.

use core::f64::consts::FRAC_PI_2;
use core::ops::{Add, Mul};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const MAX_ITERATIONS: usize = 100;
const EPS: f64 = f64::EPSILON;
const FP_MIN: f64 = 1.0e-300;
const BIG: f64 = 1.0e300;
/// Series/continued-fraction crossover.
const T_MIN: f64 = 2.0;

#[derive(Clone, Copy, Debug)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn scale(self, k: f64) -> Self {
        Self::new(self.re * k, self.im * k)
    }

    fn recip(self) -> Self {
        let norm = self.re * self.re + self.im * self.im;
        Self::new(self.re / norm, -self.im / norm)
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Returns `(Ci(x), Si(x))`.
///
/// `Si` is odd. For negative `x` the real part of the analytic
/// continuation of `Ci` is returned, i.e. `Ci(|x|)`. At zero `Ci`
/// diverges and a large negative value is returned.
pub fn cisi(x: f64) -> (f64, f64) {
    let t = libm::fabs(x);
    if t == 0.0 {
        return (-BIG, 0.0);
    }
    let (ci, si) = if t > T_MIN {
        continued_fraction(t)
    } else {
        power_series(t)
    };
    if x < 0.0 {
        (ci, -si)
    } else {
        (ci, si)
    }
}

/// Sine integral alone.
pub fn si(x: f64) -> f64 {
    cisi(x).1
}

/// Cosine integral alone.
pub fn ci(x: f64) -> f64 {
    cisi(x).0
}

fn continued_fraction(t: f64) -> (f64, f64) {
    let mut b = Complex::new(1.0, t);
    let mut c = Complex::new(BIG, 0.0);
    let mut d = b.recip();
    let mut h = d;
    for i in 1..MAX_ITERATIONS {
        let a = -((i * i) as f64);
        b = b + Complex::new(2.0, 0.0);
        d = (d.scale(a) + b).recip();
        c = b + c.recip().scale(a);
        let del = c * d;
        h = h * del;
        if libm::fabs(del.re - 1.0) + libm::fabs(del.im) <= EPS {
            break;
        }
    }
    let h = Complex::new(libm::cos(t), -libm::sin(t)) * h;
    (-h.re, h.im + FRAC_PI_2)
}

fn power_series(t: f64) -> (f64, f64) {
    let (sum_c, sum_s) = if t < libm::sqrt(FP_MIN) {
        (0.0, t)
    } else {
        let mut sum = 0.0;
        let mut sum_s = 0.0;
        let mut sum_c = 0.0;
        let mut sign = 1.0;
        let mut fact = 1.0;
        let mut odd = true;
        for k in 1..=MAX_ITERATIONS {
            fact *= t / k as f64;
            let term = fact / k as f64;
            sum += sign * term;
            let err = term / libm::fabs(sum);
            if odd {
                sign = -sign;
                sum_s = sum;
                sum = sum_c;
            } else {
                sum_c = sum;
                sum = sum_s;
            }
            if err < EPS {
                break;
            }
            odd = !odd;
        }
        (sum_c, sum_s)
    };
    (sum_c + libm::log(t) + EULER_GAMMA, sum_s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Reference values from Abramowitz & Stegun table 5.1
    const REFERENCE: [(f64, f64, f64); 5] = [
        (0.5, -0.177_784_078_806_612_8, 0.493_107_418_043_066_7),
        (1.0, 0.337_403_922_900_968_1, 0.946_083_070_367_183_0),
        (2.0, 0.422_980_828_774_864_9, 1.605_412_976_802_694_8),
        (5.0, -0.190_029_749_656_643_9, 1.549_931_244_944_674_1),
        (10.0, -0.045_456_433_004_455_4, 1.658_347_594_218_874_0),
    ];

    #[test]
    fn matches_reference_values() {
        for (x, ci_ref, si_ref) in REFERENCE {
            let (c, s) = cisi(x);
            assert_abs_diff_eq!(c, ci_ref, epsilon = 1e-12);
            assert_abs_diff_eq!(s, si_ref, epsilon = 1e-12);
        }
    }

    #[test]
    fn si_is_odd() {
        for x in [0.3, 1.7, 2.5, 12.0] {
            assert_abs_diff_eq!(si(-x), -si(x), epsilon = 1e-15);
            assert_abs_diff_eq!(ci(-x), ci(x), epsilon = 1e-15);
        }
    }

    #[test]
    fn si_approaches_half_pi() {
        assert_abs_diff_eq!(si(1.0e4), FRAC_PI_2, epsilon = 1e-3);
        assert_eq!(si(0.0), 0.0);
    }

    #[test]
    fn continuous_at_crossover() {
        let below = cisi(T_MIN - 1e-9);
        let above = cisi(T_MIN + 1e-9);
        assert_abs_diff_eq!(below.0, above.0, epsilon = 1e-8);
        assert_abs_diff_eq!(below.1, above.1, epsilon = 1e-8);
    }
}
