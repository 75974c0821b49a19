// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-style tests over randomized inputs, backed by `rand` as a
//! dev-dependency (SPEC_FULL.md §10.4).

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use vecraster::roots::solve_quadratic;
use vecraster::{Path, Point, Rect};

#[test]
fn quadratic_roots_satisfy_the_equation() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let a: f64 = rng.gen_range(-10.0..10.0);
        let b: f64 = rng.gen_range(-10.0..10.0);
        let c: f64 = rng.gen_range(-10.0..10.0);
        if a.abs() < 1e-6 {
            continue;
        }
        for t in solve_quadratic(a, b, c) {
            let residual = a * t * t + b * t + c;
            assert!(residual.abs() < 1e-3, "a={a} b={b} c={c} t={t} residual={residual}");
        }
    }
}

#[test]
fn rectangle_winding_is_nonzero_inside_zero_outside() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let x0: f64 = rng.gen_range(-50.0..50.0);
        let y0: f64 = rng.gen_range(-50.0..50.0);
        let w: f64 = rng.gen_range(1.0..50.0);
        let h: f64 = rng.gen_range(1.0..50.0);

        let mut path = Path::new();
        path.add_rect(Rect::new(x0, y0, x0 + w, y0 + h));

        let inside = Point::new(x0 + w / 2.0, y0 + h / 2.0);
        let outside = Point::new(x0 - w, y0 - h);

        assert_ne!(path.winding(inside), 0);
        assert_eq!(path.winding(outside), 0);
    }
}

#[test]
fn path_area_matches_rectangle_dimensions() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..100 {
        let w: f64 = rng.gen_range(1.0..100.0);
        let h: f64 = rng.gen_range(1.0..100.0);
        let mut path = Path::new();
        path.add_rect(Rect::new(0.0, 0.0, w, h));
        assert!((path.area().abs() - w * h).abs() < 1e-6);
    }
}
