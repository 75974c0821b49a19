// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adaptive flattening of [`Path`] curves into polylines, grouped by subpath
//! so downstream tiling never sees a phantom edge connecting two unrelated
//! subpaths.

use crate::geom::Point;
use crate::path::{subdivide_cubic, Path, PathElement};

/// Default flatness tolerance in device pixels, matching the teacher's
/// `flatten.rs::TOL` constant.
pub const DEFAULT_TOLERANCE: f64 = 0.25;

/// A single flattened line segment, in the same precision the tiler walks in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatLine {
    pub p0: Point,
    pub p1: Point,
}

impl FlatLine {
    pub fn new(p0: Point, p1: Point) -> Self {
        FlatLine { p0, p1 }
    }
}

/// Flatten every subpath of `path` into line segments, never bridging across
/// a `MoveTo`/`Close` boundary. Each inner `Vec` is one subpath's polyline.
pub fn flatten_path(path: &Path, tolerance: f64) -> Vec<Vec<FlatLine>> {
    let mut subpaths = Vec::new();
    let mut current: Vec<FlatLine> = Vec::new();
    let mut start = Point::ZERO;
    let mut p0 = Point::ZERO;
    let mut closed = false;

    let close_subpath = |current: &mut Vec<FlatLine>, subpaths: &mut Vec<Vec<FlatLine>>| {
        if !current.is_empty() {
            subpaths.push(std::mem::take(current));
        }
    };

    for el in path.elements() {
        match *el {
            PathElement::MoveTo(p) => {
                close_subpath(&mut current, &mut subpaths);
                start = p;
                p0 = p;
                closed = false;
            }
            PathElement::LineTo(p) => {
                push_line(&mut current, p0, p);
                p0 = p;
            }
            PathElement::QuadTo(c, p) => {
                flatten_quad(p0, c, p, tolerance, &mut current);
                p0 = p;
            }
            PathElement::CubicTo(c1, c2, p) => {
                flatten_cubic(p0, c1, c2, p, tolerance, &mut current);
                p0 = p;
            }
            PathElement::Close => {
                if !closed {
                    push_line(&mut current, p0, start);
                }
                p0 = start;
                closed = true;
            }
        }
    }
    close_subpath(&mut current, &mut subpaths);
    subpaths
}

fn push_line(out: &mut Vec<FlatLine>, p0: Point, p1: Point) {
    if p0 != p1 {
        out.push(FlatLine::new(p0, p1));
    }
}

/// Perpendicular distance from `c` to the chord `p0`-`p1`, the flatness
/// metric used for quadratic subdivision.
fn quad_flatness(p0: Point, c: Point, p1: Point) -> f64 {
    let chord = p1 - p0;
    let len = chord.hypot();
    if len < 1e-9 {
        return c.distance(p0);
    }
    (chord.x * (c.y - p0.y) - chord.y * (c.x - p0.x)).abs() / len
}

fn flatten_quad(p0: Point, c: Point, p1: Point, tolerance: f64, out: &mut Vec<FlatLine>) {
    flatten_quad_rec(p0, c, p1, tolerance, out, 0);
}

fn flatten_quad_rec(p0: Point, c: Point, p1: Point, tolerance: f64, out: &mut Vec<FlatLine>, depth: u32) {
    if quad_flatness(p0, c, p1) <= tolerance || depth >= 24 {
        push_line(out, p0, p1);
        return;
    }
    let c01 = p0.lerp(c, 0.5);
    let c12 = c.lerp(p1, 0.5);
    let mid = c01.lerp(c12, 0.5);
    flatten_quad_rec(p0, c01, mid, tolerance, out, depth + 1);
    flatten_quad_rec(mid, c12, p1, tolerance, out, depth + 1);
}

/// Flatness metric for a cubic: max perpendicular distance of either control
/// point from the chord, matching the teacher's two-control-point deviation
/// check.
fn cubic_flatness(p0: Point, c1: Point, c2: Point, p1: Point) -> f64 {
    let chord = p1 - p0;
    let len = chord.hypot();
    if len < 1e-9 {
        return c1.distance(p0).max(c2.distance(p0));
    }
    let d1 = (chord.x * (c1.y - p0.y) - chord.y * (c1.x - p0.x)).abs() / len;
    let d2 = (chord.x * (c2.y - p0.y) - chord.y * (c2.x - p0.x)).abs() / len;
    d1.max(d2)
}

fn flatten_cubic(p0: Point, c1: Point, c2: Point, p1: Point, tolerance: f64, out: &mut Vec<FlatLine>) {
    flatten_cubic_rec(p0, c1, c2, p1, tolerance, out, 0);
}

fn flatten_cubic_rec(
    p0: Point,
    c1: Point,
    c2: Point,
    p1: Point,
    tolerance: f64,
    out: &mut Vec<FlatLine>,
    depth: u32,
) {
    if cubic_flatness(p0, c1, c2, p1) <= tolerance || depth >= 24 {
        push_line(out, p0, p1);
        return;
    }
    let (l, r) = subdivide_cubic(p0, c1, c2, p1, 0.5);
    flatten_cubic_rec(l.0, l.1, l.2, l.3, tolerance, out, depth + 1);
    flatten_cubic_rec(r.0, r.1, r.2, r.3, tolerance, out, depth + 1);
}
