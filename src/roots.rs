// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numerically stable root finding for the quadratic and cubic equations that
//! show up throughout curve flattening, winding computation and stroke
//! offsetting.

const EPSILON: f64 = 1e-12;

/// Solve `a*t^2 + b*t + c = 0`, returning real roots sorted ascending.
///
/// Uses the numerically stable formula (computing one root via the usual
/// quadratic formula, sign-matched to avoid catastrophic cancellation, then
/// deriving the other via Vieta's formula `t1 * t2 = c / a`) rather than
/// applying the textbook formula twice.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < EPSILON {
        // Degrades to a linear equation b*t + c = 0.
        if b.abs() < EPSILON {
            return Vec::new();
        }
        return vec![-c / b];
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }

    let sqrt_disc = disc.sqrt();
    // q has the same sign as b to avoid subtracting nearly-equal values.
    let q = if b >= 0.0 {
        -0.5 * (b + sqrt_disc)
    } else {
        -0.5 * (b - sqrt_disc)
    };

    let mut roots = if q.abs() < EPSILON {
        vec![-b / (2.0 * a)]
    } else {
        let t1 = q / a;
        let t2 = c / q;
        vec![t1, t2]
    };
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap());
    roots
}

/// As [`solve_quadratic`], but only keeps roots within `[0, 1]` (inclusive,
/// with a small tolerance), the domain curve parameters live in.
pub fn solve_quadratic_01(a: f64, b: f64, c: f64) -> Vec<f64> {
    solve_quadratic(a, b, c)
        .into_iter()
        .filter(|t| *t >= -EPSILON && *t <= 1.0 + EPSILON)
        .map(|t| t.clamp(0.0, 1.0))
        .collect()
}

/// Solve `a*t^3 + b*t^2 + c*t + d = 0` via Cardano's method on the depressed
/// cubic, returning real roots sorted ascending.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < EPSILON {
        return solve_quadratic(b, c, d);
    }

    // Normalize to t^3 + pt^2 + qt + r = 0.
    let p = b / a;
    let q = c / a;
    let r = d / a;

    // Depress via t = u - p/3: u^3 + Pu + Q = 0.
    let shift = p / 3.0;
    let pp = q - p * p / 3.0;
    let qq = 2.0 * p * p * p / 27.0 - p * q / 3.0 + r;

    let mut roots = if pp.abs() < EPSILON && qq.abs() < EPSILON {
        vec![0.0]
    } else if pp.abs() < EPSILON {
        vec![(-qq).cbrt()]
    } else {
        let disc = (qq * qq / 4.0) + (pp * pp * pp / 27.0);
        if disc > EPSILON {
            // One real root.
            let sqrt_disc = disc.sqrt();
            let u = (-qq / 2.0 + sqrt_disc).cbrt();
            let v = (-qq / 2.0 - sqrt_disc).cbrt();
            vec![u + v]
        } else if disc > -EPSILON {
            // Double/triple root.
            let u = (-qq / 2.0).cbrt();
            vec![2.0 * u, -u]
        } else {
            // Three distinct real roots via the trigonometric form.
            let m = 2.0 * (-pp / 3.0).sqrt();
            let theta = ((3.0 * qq) / (pp * m)).clamp(-1.0, 1.0).acos() / 3.0;
            let two_pi_3 = std::f64::consts::TAU / 3.0;
            vec![
                m * theta.cos(),
                m * (theta - two_pi_3).cos(),
                m * (theta - 2.0 * two_pi_3).cos(),
            ]
        }
    };

    for t in roots.iter_mut() {
        *t -= shift;
    }
    roots.sort_by(|x, y| x.partial_cmp(y).unwrap());
    roots
}

/// As [`solve_cubic`], restricted to roots within `[0, 1]`.
pub fn solve_cubic_01(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    solve_cubic(a, b, c, d)
        .into_iter()
        .filter(|t| *t >= -EPSILON && *t <= 1.0 + EPSILON)
        .map(|t| t.clamp(0.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn quadratic_two_roots() {
        // (t - 2)(t - 3) = t^2 - 5t + 6
        let roots = solve_quadratic(1.0, -5.0, 6.0);
        assert_eq!(roots.len(), 2);
        assert_close(roots[0], 2.0);
        assert_close(roots[1], 3.0);
    }

    #[test]
    fn quadratic_no_real_roots() {
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn quadratic_degenerate_is_linear() {
        let roots = solve_quadratic(0.0, 2.0, -4.0);
        assert_eq!(roots.len(), 1);
        assert_close(roots[0], 2.0);
    }

    #[test]
    fn cubic_one_real_root() {
        // t^3 - 1 = 0 => t = 1
        let roots = solve_cubic(1.0, 0.0, 0.0, -1.0);
        assert_eq!(roots.len(), 1);
        assert_close(roots[0], 1.0);
    }

    #[test]
    fn cubic_three_real_roots() {
        // (t+1)(t)(t-1) = t^3 - t
        let roots = solve_cubic(1.0, 0.0, -1.0, 0.0);
        assert_eq!(roots.len(), 3);
        assert_close(roots[0], -1.0);
        assert_close(roots[1], 0.0);
        assert_close(roots[2], 1.0);
    }

    #[test]
    fn cubic_triple_root() {
        // (t - 2)^3 = t^3 - 6t^2 + 12t - 8
        let roots = solve_cubic(1.0, -6.0, 12.0, -8.0);
        for t in roots {
            assert_close(t, 2.0);
        }
    }
}
