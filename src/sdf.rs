// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signed-distance-field coverage for the primitive shapes (circle, ellipse,
//! rounded rect) that don't need to go through general path flattening and
//! tile binning — component F.

use crate::geom::Point;
use crate::path::{Path, PathElement};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Circle { center: Point, radius: f64 },
    Ellipse { center: Point, rx: f64, ry: f64 },
    RoundedRect { min: Point, max: Point, radius: f64 },
}

const KAPPA: f64 = 0.5522847498307936;
const EPS: f64 = 1e-6;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

fn approx_pt(a: Point, b: Point) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y)
}

/// Recognize a [`Path`] built by [`Path::add_circle`]/[`Path::add_ellipse`]/
/// [`Path::add_rounded_rect`] and recover its shape parameters, so `fill_path`
/// can bypass general tile binning and go straight through the SDF
/// rasterizer (component F). Returns `None` for anything else, including
/// rects built by `add_rect` (those go through the tile grid's own
/// axis-aligned-rect fast path instead).
pub fn detect(path: &Path) -> Option<Shape> {
    let elements = path.elements();
    match elements.len() {
        6 => detect_ellipse(elements),
        10 => detect_rounded_rect(elements),
        _ => None,
    }
}

fn detect_ellipse(el: &[PathElement]) -> Option<Shape> {
    let PathElement::MoveTo(p0) = el[0] else { return None };
    let mut curves = Vec::with_capacity(4);
    for e in &el[1..5] {
        match *e {
            PathElement::CubicTo(c1, c2, p) => curves.push((c1, c2, p)),
            _ => return None,
        }
    }
    if !matches!(el[5], PathElement::Close) {
        return None;
    }

    // The on-curve points are the right/bottom/left/top vertices of the
    // ellipse's bounding box, in that order.
    let right = p0;
    let bottom = curves[0].2;
    let left = curves[1].2;
    let top = curves[2].2;
    let end = curves[3].2;
    if !approx_pt(end, right) {
        return None;
    }

    let center = Point::new((left.x + right.x) * 0.5, (top.y + bottom.y) * 0.5);
    let rx = (right.x - left.x) * 0.5;
    let ry = (bottom.y - top.y) * 0.5;
    if rx <= 0.0 || ry <= 0.0 {
        return None;
    }
    let (cx, cy) = (center.x, center.y);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);

    let expected = [
        (Point::new(cx + rx, cy + ky), Point::new(cx + kx, cy + ry), bottom),
        (Point::new(cx - kx, cy + ry), Point::new(cx - rx, cy + ky), left),
        (Point::new(cx - rx, cy - ky), Point::new(cx - kx, cy - ry), top),
        (Point::new(cx + kx, cy - ry), Point::new(cx + rx, cy - ky), right),
    ];
    for ((c1, c2, p), (ec1, ec2, ep)) in curves.iter().zip(expected.iter()) {
        if !approx_pt(*c1, *ec1) || !approx_pt(*c2, *ec2) || !approx_pt(*p, *ep) {
            return None;
        }
    }

    if approx(rx, ry) {
        Some(Shape::Circle { center, radius: rx })
    } else {
        Some(Shape::Ellipse { center, rx, ry })
    }
}

fn detect_rounded_rect(el: &[PathElement]) -> Option<Shape> {
    let PathElement::MoveTo(m0) = el[0] else { return None };
    let PathElement::LineTo(l0) = el[1] else { return None };
    let PathElement::CubicTo(c1a, c1b, p1) = el[2] else { return None };
    let PathElement::LineTo(l1) = el[3] else { return None };
    let PathElement::CubicTo(c2a, c2b, p2) = el[4] else { return None };
    let PathElement::LineTo(l2) = el[5] else { return None };
    let PathElement::CubicTo(c3a, c3b, p3) = el[6] else { return None };
    let PathElement::LineTo(l3) = el[7] else { return None };
    let PathElement::CubicTo(c4a, c4b, p4) = el[8] else { return None };
    if !matches!(el[9], PathElement::Close) {
        return None;
    }
    if !approx_pt(p4, m0) {
        return None;
    }

    let x0 = p3.x.min(p2.x); // left edge, from the two points lying on it
    let x1 = p1.x.max(l0.x); // right edge
    let y0 = p4.y.min(l3.y); // top edge
    let y1 = p2.y.max(l1.y); // bottom edge

    let r = m0.x - x0;
    if r <= 0.0 {
        return None;
    }
    let k = r * KAPPA;

    let expect_m0 = Point::new(x0 + r, y0);
    let expect_l0 = Point::new(x1 - r, y0);
    let expect_c1 = (Point::new(x1 - r + k, y0), Point::new(x1, y0 + r - k), Point::new(x1, y0 + r));
    let expect_l1 = Point::new(x1, y1 - r);
    let expect_c2 = (Point::new(x1, y1 - r + k), Point::new(x1 - r + k, y1), Point::new(x1 - r, y1));
    let expect_l2 = Point::new(x0 + r, y1);
    let expect_c3 = (Point::new(x0 + r - k, y1), Point::new(x0, y1 - r + k), Point::new(x0, y1 - r));
    let expect_l3 = Point::new(x0, y0 + r);
    let expect_c4 = (Point::new(x0, y0 + r - k), Point::new(x0 + r - k, y0), Point::new(x0 + r, y0));

    let ok = approx_pt(m0, expect_m0)
        && approx_pt(l0, expect_l0)
        && approx_pt(c1a, expect_c1.0) && approx_pt(c1b, expect_c1.1) && approx_pt(p1, expect_c1.2)
        && approx_pt(l1, expect_l1)
        && approx_pt(c2a, expect_c2.0) && approx_pt(c2b, expect_c2.1) && approx_pt(p2, expect_c2.2)
        && approx_pt(l2, expect_l2)
        && approx_pt(c3a, expect_c3.0) && approx_pt(c3b, expect_c3.1) && approx_pt(p3, expect_c3.2)
        && approx_pt(l3, expect_l3)
        && approx_pt(c4a, expect_c4.0) && approx_pt(c4b, expect_c4.1);

    if !ok {
        return None;
    }
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(Shape::RoundedRect { min: Point::new(x0, y0), max: Point::new(x1, y1), radius: r })
}

impl Shape {
    /// Signed distance from `p` to the shape boundary: negative inside,
    /// positive outside.
    pub fn distance(&self, p: Point) -> f64 {
        match *self {
            Shape::Circle { center, radius } => p.distance(center) - radius,
            Shape::Ellipse { center, rx, ry } => ellipse_distance(p, center, rx, ry),
            Shape::RoundedRect { min, max, radius } => rounded_rect_distance(p, min, max, radius),
        }
    }

    pub fn bounding_box(&self) -> (Point, Point) {
        match *self {
            Shape::Circle { center, radius } => {
                (Point::new(center.x - radius, center.y - radius), Point::new(center.x + radius, center.y + radius))
            }
            Shape::Ellipse { center, rx, ry } => {
                (Point::new(center.x - rx, center.y - ry), Point::new(center.x + rx, center.y + ry))
            }
            Shape::RoundedRect { min, max, .. } => (min, max),
        }
    }

    /// Anti-aliased fill coverage at `p`, a smoothstep over one pixel of
    /// falloff centered on the zero crossing.
    pub fn fill_coverage(&self, p: Point) -> f32 {
        smoothstep_coverage(self.distance(p))
    }

    /// Anti-aliased stroke coverage at `p` for a stroke of total `width`
    /// centered on the boundary.
    pub fn stroke_coverage(&self, p: Point, width: f64) -> f32 {
        let d = self.distance(p).abs() - width * 0.5;
        smoothstep_coverage(d)
    }
}

/// Exact signed distance from `p` to an axis-aligned ellipse, via Newton
/// iteration on the closest-point parameterization (closed form only exists
/// for the circle case).
fn ellipse_distance(p: Point, center: Point, rx: f64, ry: f64) -> f64 {
    if rx <= 0.0 || ry <= 0.0 {
        return f64::INFINITY;
    }
    // Work in the ellipse's local, axis-aligned frame, first quadrant only
    // by symmetry.
    let local = Point::new((p.x - center.x).abs(), (p.y - center.y).abs());

    if rx == ry {
        return local.hypot() - rx;
    }

    let (a, b) = (rx.max(ry), rx.min(ry));
    let (lx, ly) = if rx >= ry { (local.x, local.y) } else { (local.y, local.x) };

    // Newton iteration for the closest point on the ellipse (standard
    // approach; converges in a handful of steps for any reasonable aspect
    // ratio).
    let mut t = (ly / b).atan2(lx / a).max(1e-6);
    for _ in 0..8 {
        let cos_t = t.cos();
        let sin_t = t.sin();
        let ex = a * cos_t;
        let ey = b * sin_t;
        let rx_ = lx - ex;
        let ry_ = ly - ey;
        let qx = -a * sin_t;
        let qy = b * cos_t;
        let denom = qx * qx + qy * qy;
        if denom.abs() < 1e-12 {
            break;
        }
        let dt = (rx_ * qx + ry_ * qy) / denom;
        t += dt;
        t = t.clamp(0.0, std::f64::consts::FRAC_PI_2);
    }
    let closest = Point::new(a * t.cos(), b * t.sin());
    let dist = Point::new(lx, ly).distance(closest);
    let inside = (lx / a).powi(2) + (ly / b).powi(2) < 1.0;
    if inside {
        -dist
    } else {
        dist
    }
}

fn rounded_rect_distance(p: Point, min: Point, max: Point, radius: f64) -> f64 {
    let center = Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5);
    let half = Point::new((max.x - min.x) * 0.5, (max.y - min.y) * 0.5);
    let r = radius.min(half.x).min(half.y).max(0.0);

    let q = Point::new((p.x - center.x).abs() - (half.x - r), (p.y - center.y).abs() - (half.y - r));
    let outside = Point::new(q.x.max(0.0), q.y.max(0.0)).hypot();
    let inside = q.x.max(q.y).min(0.0);
    outside + inside - r
}

/// One-pixel-wide smoothstep centered on `d == 0`, the standard AA falloff
/// for SDF shapes: coverage is 1.0 well inside, 0.0 well outside, and exactly
/// 0.5 right at the boundary.
fn smoothstep_coverage(d: f64) -> f32 {
    let t = (0.5 - d).clamp(0.0, 1.0) as f32;
    (t * t * (3.0 - 2.0 * t)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_center_is_fully_inside() {
        let shape = Shape::Circle { center: Point::new(0.0, 0.0), radius: 10.0 };
        assert_eq!(shape.fill_coverage(Point::new(0.0, 0.0)), 1.0);
    }

    #[test]
    fn circle_far_outside_is_uncovered() {
        let shape = Shape::Circle { center: Point::new(0.0, 0.0), radius: 10.0 };
        assert_eq!(shape.fill_coverage(Point::new(100.0, 100.0)), 0.0);
    }

    #[test]
    fn circle_boundary_is_half_covered() {
        let shape = Shape::Circle { center: Point::new(0.0, 0.0), radius: 10.0 };
        let cov = shape.fill_coverage(Point::new(10.0, 0.0));
        assert!((cov - 0.5).abs() < 1e-3);
    }

    #[test]
    fn ellipse_matches_circle_distance_when_axes_equal() {
        let ellipse = Shape::Ellipse { center: Point::new(0.0, 0.0), rx: 5.0, ry: 5.0 };
        let circle = Shape::Circle { center: Point::new(0.0, 0.0), radius: 5.0 };
        let p = Point::new(3.0, 4.0);
        assert!((ellipse.distance(p) - circle.distance(p)).abs() < 1e-6);
    }

    #[test]
    fn rounded_rect_corner_radius_softens_corner() {
        let shape = Shape::RoundedRect { min: Point::new(0.0, 0.0), max: Point::new(20.0, 20.0), radius: 5.0 };
        // The sharp corner point itself should read as outside the rounded shape.
        assert!(shape.distance(Point::new(0.0, 0.0)) > 0.0);
        assert!(shape.distance(Point::new(10.0, 10.0)) < 0.0);
    }

    #[test]
    fn detect_recognizes_circle() {
        let mut path = Path::new();
        path.add_circle(Point::new(5.0, 5.0), 3.0);
        match detect(&path) {
            Some(Shape::Circle { center, radius }) => {
                assert!(approx_pt(center, Point::new(5.0, 5.0)));
                assert!(approx(radius, 3.0));
            }
            other => panic!("expected Circle, got {other:?}"),
        }
    }

    #[test]
    fn detect_recognizes_ellipse() {
        let mut path = Path::new();
        path.add_ellipse(Point::new(1.0, 2.0), 4.0, 7.0);
        match detect(&path) {
            Some(Shape::Ellipse { center, rx, ry }) => {
                assert!(approx_pt(center, Point::new(1.0, 2.0)));
                assert!(approx(rx, 4.0));
                assert!(approx(ry, 7.0));
            }
            other => panic!("expected Ellipse, got {other:?}"),
        }
    }

    #[test]
    fn detect_recognizes_rounded_rect() {
        let mut path = Path::new();
        path.add_rounded_rect(crate::geom::Rect::new(0.0, 0.0, 20.0, 10.0), 3.0);
        match detect(&path) {
            Some(Shape::RoundedRect { min, max, radius }) => {
                assert!(approx_pt(min, Point::new(0.0, 0.0)));
                assert!(approx_pt(max, Point::new(20.0, 10.0)));
                assert!(approx(radius, 3.0));
            }
            other => panic!("expected RoundedRect, got {other:?}"),
        }
    }

    #[test]
    fn detect_rejects_plain_rect() {
        let mut path = Path::new();
        path.add_rect(crate::geom::Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(detect(&path), None);
    }

    #[test]
    fn detect_rejects_arbitrary_path() {
        let mut path = Path::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        path.line_to(Point::new(5.0, 10.0));
        path.close();
        assert_eq!(detect(&path), None);
    }
}
