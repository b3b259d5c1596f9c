//! Closed form polynomial root finding
//!
//! Both solvers work in complex arithmetic with no iteration and no
//! allocation. Coefficients are given highest power first.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_complex::Complex64;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Roots with an imaginary part smaller than this are treated as real.
pub const REAL_ROOT_TOLERANCE: f64 = 1e-6;

/// Magnitude below which an intermediate term is treated as zero.
const ZERO_TOLERANCE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve `a x^2 + b x + c = 0`.
///
/// If `a` is zero the equation is solved as a linear one and the single root
/// is returned twice.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> [Complex64; 2] {
    if a == 0.0 {
        let x = Complex64::new(-c / b, 0.0);
        return [x, x];
    }

    let a = Complex64::new(a, 0.0);
    let disc = Complex64::new(b * b - 4.0 * c * a.re, 0.0).sqrt();

    [(-b - disc) / (2.0 * a), (-b + disc) / (2.0 * a)]
}

/// Solve `a x^4 + b x^3 + c x^2 + d x + e = 0`.
///
/// Uses the resolvent cubic form of the general quartic formula. The cube
/// root branch giving the largest resolvent term is chosen to keep the
/// division by it well conditioned.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> [Complex64; 4] {
    let a = Complex64::new(a, 0.0);
    let b = b / a;
    let c = c / a;
    let d = d / a;
    let e = e / a;

    let q1 = c * c - 3.0 * b * d + 12.0 * e;
    let q2 = 2.0 * c * c * c - 9.0 * b * c * d + 27.0 * d * d + 27.0 * b * b * e - 72.0 * c * e;
    let q3 = 8.0 * b * c - 16.0 * d - 2.0 * b * b * b;
    let q4 = 3.0 * b * b - 8.0 * c;

    let disc = (q2 * q2 / 4.0 - q1 * q1 * q1).sqrt();
    let mut base = q2 / 2.0 + disc;
    if base.norm() < ZERO_TOLERANCE {
        base = q2 / 2.0 - disc;
    }
    let q5 = base.powf(1.0 / 3.0);

    // Pick the cube root branch maximising |q7|
    let omega = Complex64::from_polar(1.0, 2.0 * std::f64::consts::FRAC_PI_3);
    let mut q6 = Complex64::new(0.0, 0.0);
    let mut q7 = Complex64::new(0.0, 0.0);
    let mut branch = q5;
    for _ in 0..3 {
        let q6_k = (safe_div(q1, branch) + branch) / 3.0;
        let q7_k = 2.0 * (q4 / 12.0 + q6_k).sqrt();

        if q7_k.norm() >= q7.norm() {
            q6 = q6_k;
            q7 = q7_k;
        }

        branch *= omega;
    }

    let q3_q7 = safe_div(q3, q7);
    let inner = 4.0 * q4 / 6.0 - 4.0 * q6;
    let minus = (inner - q3_q7).sqrt();
    let plus = (inner + q3_q7).sqrt();

    [
        (-b - q7 - minus) / 4.0,
        (-b - q7 + minus) / 4.0,
        (-b + q7 - plus) / 4.0,
        (-b + q7 + plus) / 4.0,
    ]
}

/// Return the smallest strictly positive real root, if there is one.
pub fn earliest_positive_real_root(roots: &[Complex64]) -> Option<f64> {
    roots
        .iter()
        .filter(|r| r.im.abs() < REAL_ROOT_TOLERANCE && r.re > 0.0)
        .map(|r| r.re)
        .fold(None, |min, r| match min {
            Some(m) if m <= r => Some(m),
            _ => Some(r),
        })
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn safe_div(num: Complex64, den: Complex64) -> Complex64 {
    if den.norm() < ZERO_TOLERANCE {
        Complex64::new(0.0, 0.0)
    } else {
        num / den
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Expand `k (x - r0)(x - r1)(x - r2)(x - r3)` into coefficients.
    fn quartic_from_roots(k: f64, r: [f64; 4]) -> [f64; 5] {
        let s1 = r[0] + r[1] + r[2] + r[3];
        let s2 = r[0] * r[1] + r[0] * r[2] + r[0] * r[3] + r[1] * r[2] + r[1] * r[3] + r[2] * r[3];
        let s3 = r[0] * r[1] * r[2] + r[0] * r[1] * r[3] + r[0] * r[2] * r[3] + r[1] * r[2] * r[3];
        let s4 = r[0] * r[1] * r[2] * r[3];

        [k, -k * s1, k * s2, -k * s3, k * s4]
    }

    fn sorted_real(roots: &[Complex64]) -> Vec<f64> {
        let mut v: Vec<f64> = roots.iter().map(|r| r.re).collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        v
    }

    #[test]
    fn test_quadratic() {
        let r = solve_quadratic(1.0, -3.0, 2.0);
        assert_eq!(sorted_real(&r), vec![1.0, 2.0]);
        assert!(r.iter().all(|r| r.im == 0.0));

        // x^2 + 1
        let r = solve_quadratic(1.0, 0.0, 1.0);
        assert_abs_diff_eq!(r[0].im.abs(), 1.0, epsilon = 1e-12);
        assert_eq!(earliest_positive_real_root(&r), None);

        // Linear
        let r = solve_quadratic(0.0, 2.0, -4.0);
        assert_eq!(earliest_positive_real_root(&r), Some(2.0));
    }

    #[test]
    fn test_quartic_distinct_real() {
        let c = quartic_from_roots(1.0, [1.0, 2.0, 3.0, 4.0]);
        let r = solve_quartic(c[0], c[1], c[2], c[3], c[4]);

        for (got, exp) in sorted_real(&r).iter().zip(&[1.0, 2.0, 3.0, 4.0]) {
            assert_abs_diff_eq!(got, exp, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(earliest_positive_real_root(&r).unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quartic_no_positive_real() {
        // (x^2 + 1)(x^2 + 4), all complex
        let r = solve_quartic(1.0, 0.0, 5.0, 0.0, 4.0);
        assert!(r.iter().all(|r| r.im.abs() > 0.5));
        assert_eq!(earliest_positive_real_root(&r), None);

        // All negative
        let c = quartic_from_roots(2.5, [-1.0, -2.0, -3.0, -4.0]);
        let r = solve_quartic(c[0], c[1], c[2], c[3], c[4]);
        assert!(r.iter().all(|r| r.im.abs() < REAL_ROOT_TOLERANCE));
        assert_eq!(earliest_positive_real_root(&r), None);
    }

    #[test]
    fn test_quartic_biquadratic() {
        // (x^2 - 1)(x^2 - 4), the odd terms vanish
        let r = solve_quartic(1.0, 0.0, -5.0, 0.0, 4.0);
        for (got, exp) in sorted_real(&r).iter().zip(&[-2.0, -1.0, 1.0, 2.0]) {
            assert_abs_diff_eq!(got, exp, epsilon = 1e-9);
        }

        // x^4 - 16, two real and two imaginary
        let r = solve_quartic(1.0, 0.0, 0.0, 0.0, -16.0);
        assert_abs_diff_eq!(earliest_positive_real_root(&r).unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quartic_random_reconstruction() {
        let mut rng = StdRng::seed_from_u64(0x7075_7272);

        for _ in 0..200 {
            let k = rng.gen_range(0.5..30.0);
            let mut roots = [0.0; 4];
            for r in roots.iter_mut() {
                *r = rng.gen_range(-5.0..5.0);
            }

            let c = quartic_from_roots(k, roots);
            let got = solve_quartic(c[0], c[1], c[2], c[3], c[4]);

            // Every returned root must satisfy the polynomial
            for &z in got.iter() {
                let val = (((c[0] * z + c[1]) * z + c[2]) * z + c[3]) * z + c[4];
                assert!(
                    val.norm() < 1e-6 * (1.0 + c.iter().map(|v| v.abs()).sum::<f64>()),
                    "root {} of {:?} gives residual {}",
                    z,
                    c,
                    val
                );
            }
        }
    }
}
