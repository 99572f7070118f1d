// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Student t and Fisher-Snedecor distributions, enough of them to turn test
//! statistics into p-values and confidence bounds.
//!
//! Both tails are computed through the regularised incomplete beta function
//! `I_x(a, b)`:
//!
//! - t with ν degrees of freedom: `P(|T| > t) = I_{ν/(ν+t²)}(ν/2, 1/2)`
//! - F with (d1, d2) degrees of freedom: `P(F > x) = I_{d2/(d2+d1·x)}(d2/2, d1/2)`

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const CONTINUED_FRACTION_MAX_ITER: usize = 300;
const CONTINUED_FRACTION_EPS: f64 = 1e-15;
const FPMIN: f64 = 1e-300;

/// Natural log of the gamma function for `x > 0` (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula.
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut sum = LANCZOS_COEFFICIENTS[0];
        for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
            sum += coefficient / (x + i as f64);
        }
        let t = x + LANCZOS_G + 0.5;
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
    }
}

/// Regularised incomplete beta function `I_x(a, b)`.
pub fn betainc(a: f64, b: f64, x: f64) -> f64 {
    if x.is_nan() || a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    // The continued fraction converges quickly only on this side of the mean.
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Modified Lentz evaluation of the continued fraction for `I_x(a, b)`.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let clamp = |v: f64| if v.abs() < FPMIN { FPMIN } else { v };
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / clamp(1.0 - qab * x / qap);
    let mut h = d;
    for m in 1..=CONTINUED_FRACTION_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / clamp(1.0 + aa * d);
        c = clamp(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / clamp(1.0 + aa * d);
        c = clamp(1.0 + aa / c);
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < CONTINUED_FRACTION_EPS {
            break;
        }
    }
    h
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentT {
    df: f64,
}

impl StudentT {
    /// `None` unless `df` is finite and positive.
    pub fn new(df: f64) -> Option<Self> {
        (df.is_finite() && df > 0.0).then_some(Self { df })
    }

    pub fn cdf(&self, t: f64) -> f64 {
        if t.is_nan() {
            return f64::NAN;
        }
        if t == 0.0 {
            return 0.5;
        }
        let tail = 0.5 * betainc(self.df / 2.0, 0.5, self.df / (self.df + t * t));
        if t > 0.0 {
            1.0 - tail
        } else {
            tail
        }
    }

    pub fn sf(&self, t: f64) -> f64 {
        self.cdf(-t)
    }

    /// `P(|T| > |t|)`.
    pub fn two_sided_p(&self, t: f64) -> f64 {
        if t.is_nan() {
            return f64::NAN;
        }
        if t.is_infinite() {
            return 0.0;
        }
        betainc(self.df / 2.0, 0.5, self.df / (self.df + t * t))
    }

    /// Inverse CDF by bisection. `p` outside `(0, 1)` maps to the infinities.
    pub fn ppf(&self, p: f64) -> f64 {
        if p.is_nan() {
            return f64::NAN;
        }
        if p <= 0.0 {
            return f64::NEG_INFINITY;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        if p == 0.5 {
            return 0.0;
        }
        if p < 0.5 {
            return -self.ppf(1.0 - p);
        }
        let mut lo = 0.0;
        let mut hi = 1.0;
        while self.cdf(hi) < p && hi < 1e12 {
            lo = hi;
            hi *= 2.0;
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= 1e-12 * hi.max(1.0) {
                break;
            }
        }
        0.5 * (lo + hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherSnedecor {
    d1: f64,
    d2: f64,
}

impl FisherSnedecor {
    /// `None` unless both degrees of freedom are finite and positive.
    pub fn new(d1: f64, d2: f64) -> Option<Self> {
        let valid = |d: f64| d.is_finite() && d > 0.0;
        (valid(d1) && valid(d2)).then_some(Self { d1, d2 })
    }

    pub fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        1.0 - self.sf(x)
    }

    pub fn sf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x <= 0.0 {
            return 1.0;
        }
        if x.is_infinite() {
            return 0.0;
        }
        betainc(self.d2 / 2.0, self.d1 / 2.0, self.d2 / (self.d2 + self.d1 * x))
    }
}
