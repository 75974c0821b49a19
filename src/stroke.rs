// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke-to-fill expansion: turns a centerline (already flattened into
//! polylines by [`crate::flatten`]) plus a [`StrokeStyle`] into closed fill
//! contours that the tile rasterizer can treat like any other filled path.

use crate::flatten::FlatLine;
use crate::geom::Point;
use crate::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cap {
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    Miter,
    Round,
    Bevel,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: Cap,
    pub join: Join,
    /// Ratio of miter length to stroke width above which a miter join
    /// degrades to a bevel join.
    pub miter_limit: f64,
    /// Alternating on/off lengths, in the same units as the centerline.
    /// Empty means no dashing.
    pub dash_pattern: Vec<f64>,
    pub dash_offset: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        StrokeStyle {
            width: 1.0,
            cap: Cap::Butt,
            join: Join::Miter,
            miter_limit: 4.0,
            dash_pattern: Vec::new(),
            dash_offset: 0.0,
        }
    }
}

/// A device-space stroke is rendered as a hairline (component E) rather than
/// expanded to a fill once its on-screen width drops to a pixel or below.
pub fn is_hairline(device_width: f64) -> bool {
    device_width <= 1.0
}

/// A single segment of a stroke outline contour: either a straight edge or a
/// cubic Bezier arc span (used for round joins/caps, approximated in chunks
/// of at most a quarter turn each via the standard kappa construction).
#[derive(Clone, Copy, Debug, PartialEq)]
enum StrokeSeg {
    Line(Point),
    Cubic(Point, Point, Point),
}

impl StrokeSeg {
    fn endpoint(&self) -> Point {
        match *self {
            StrokeSeg::Line(p) => p,
            StrokeSeg::Cubic(_, _, p) => p,
        }
    }
}

/// Expand every subpath of a flattened, tolerance-limited polyline set into
/// closed stroke-outline contours, appended to a fresh [`Path`] built purely
/// from line and cubic segments (already flat, so no further flattening of
/// the input is needed).
pub fn stroke_polylines(subpaths: &[Vec<FlatLine>], style: &StrokeStyle, closed: &[bool]) -> Path {
    let mut out = Path::new();
    let halfw = style.width * 0.5;

    for (lines, &is_closed) in subpaths.iter().zip(closed.iter()) {
        let points = polyline_points(lines);
        if points.len() < 2 {
            continue;
        }

        let dashed = if style.dash_pattern.is_empty() {
            vec![(points.clone(), is_closed)]
        } else {
            dash_polyline(&points, is_closed, &style.dash_pattern, style.dash_offset)
                .into_iter()
                .map(|p| (p, false))
                .collect()
        };

        for (pts, seg_closed) in dashed {
            if pts.len() < 2 {
                continue;
            }
            if seg_closed {
                stroke_closed(&pts, halfw, style, &mut out);
            } else {
                stroke_open(&pts, halfw, style, &mut out);
            }
        }
    }

    out
}

fn polyline_points(lines: &[FlatLine]) -> Vec<Point> {
    let mut pts = Vec::with_capacity(lines.len() + 1);
    if let Some(first) = lines.first() {
        pts.push(first.p0);
    }
    for l in lines {
        if pts.last() != Some(&l.p1) {
            pts.push(l.p1);
        }
    }
    pts
}

fn stroke_open(points: &[Point], halfw: f64, style: &StrokeStyle, out: &mut Path) {
    let (left_start, left_segs) = offset_side(points, halfw, style.join, style.miter_limit, false);
    let (right_start, right_segs) = offset_side(points, -halfw, style.join, style.miter_limit, false);
    let right_end = chain_end(right_start, &right_segs);

    let mut outline = left_segs;
    outline.extend(cap_points(points[points.len() - 1], tangent_at(points, points.len() - 1, true), halfw, style.cap));
    outline.push(StrokeSeg::Line(right_end));

    let (_, rev_inner) = reverse_chain(right_start, &right_segs);
    outline.extend(rev_inner);
    outline.extend(cap_points(points[0], tangent_at(points, 0, false), halfw, style.cap));

    emit_closed_contour(left_start, &outline, out);
}

fn stroke_closed(points: &[Point], halfw: f64, style: &StrokeStyle, out: &mut Path) {
    let (outer_start, outer_segs) = offset_side(points, halfw, style.join, style.miter_limit, true);
    let (inner_start, inner_segs) = offset_side(points, -halfw, style.join, style.miter_limit, true);

    emit_closed_contour(outer_start, &outer_segs, out);
    let (rev_start, rev_segs) = reverse_chain(inner_start, &inner_segs);
    emit_closed_contour(rev_start, &rev_segs, out);
}

fn chain_end(start: Point, segs: &[StrokeSeg]) -> Point {
    segs.last().map(StrokeSeg::endpoint).unwrap_or(start)
}

/// Reverse a connected chain of segments (`start` then each of `segs` in
/// order) into the equivalent chain traversed the other way, swapping cubic
/// control-point order as needed.
fn reverse_chain(start: Point, segs: &[StrokeSeg]) -> (Point, Vec<StrokeSeg>) {
    let mut points_before = Vec::with_capacity(segs.len() + 1);
    points_before.push(start);
    for s in segs {
        points_before.push(s.endpoint());
    }
    let new_start = *points_before.last().unwrap();

    let mut rev = Vec::with_capacity(segs.len());
    for i in (0..segs.len()).rev() {
        let target = points_before[i];
        rev.push(match segs[i] {
            StrokeSeg::Line(_) => StrokeSeg::Line(target),
            StrokeSeg::Cubic(c1, c2, _) => StrokeSeg::Cubic(c2, c1, target),
        });
    }
    (new_start, rev)
}

fn emit_closed_contour(start: Point, segs: &[StrokeSeg], out: &mut Path) {
    if segs.len() < 2 {
        return;
    }
    out.move_to(start);
    for seg in segs {
        match *seg {
            StrokeSeg::Line(p) => out.line_to(p),
            StrokeSeg::Cubic(c1, c2, p) => out.cubic_to(c1, c2, p),
        }
    }
    out.close();
}

/// Direction of travel at vertex `idx`. `at_end` picks whether the tangent
/// comes from the incoming (end cap) or outgoing (start cap) segment.
fn tangent_at(points: &[Point], idx: usize, at_end: bool) -> Point {
    if at_end {
        (points[idx] - points[idx - 1]).normalize()
    } else {
        (points[idx + 1] - points[idx]).normalize()
    }
}

fn cap_points(center: Point, tangent: Point, halfw: f64, cap: Cap) -> Vec<StrokeSeg> {
    let normal = tangent.turn_90();
    let left_end = center + normal * halfw;
    let right_end = center - normal * halfw;
    match cap {
        Cap::Butt => Vec::new(),
        Cap::Square => vec![StrokeSeg::Line(left_end + tangent * halfw), StrokeSeg::Line(right_end + tangent * halfw)],
        Cap::Round => cubic_arc_segments(center, left_end, right_end, halfw),
    }
}

/// Offset every vertex of `points` by `dist` along its local normal, inserting
/// join geometry between consecutive offset segments. `dist` may be negative
/// to offset to the opposite side. Returns the chain's starting point plus
/// the sequence of segments leading away from it.
fn offset_side(points: &[Point], dist: f64, join: Join, miter_limit: f64, closed: bool) -> (Point, Vec<StrokeSeg>) {
    let n = points.len();
    let seg_count = if closed { n } else { n - 1 };
    let seg = |i: usize| -> (Point, Point) {
        let a = points[i % n];
        let b = points[(i + 1) % n];
        (a, b)
    };
    let offset_seg = |i: usize| -> (Point, Point) {
        let (a, b) = seg(i);
        let normal = (b - a).normalize().turn_90();
        (a + normal * dist, b + normal * dist)
    };

    let mut start = Point::ZERO;
    let mut segs = Vec::with_capacity(n * 2);
    for i in 0..seg_count {
        let (oa, ob) = offset_seg(i);
        if i == 0 {
            start = oa;
        }
        segs.push(StrokeSeg::Line(ob));

        let has_next = closed || i + 1 < seg_count;
        if has_next {
            let (next_oa, _next_ob) = offset_seg((i + 1) % seg_count.max(1));
            if ob != next_oa {
                let vertex = points[(i + 1) % n];
                insert_join(&mut segs, ob, next_oa, vertex, dist.abs(), join, miter_limit);
            }
        }
    }
    (start, segs)
}

fn insert_join(segs: &mut Vec<StrokeSeg>, prev_end: Point, next_start: Point, vertex: Point, halfw: f64, join: Join, miter_limit: f64) {
    match join {
        Join::Bevel => {
            segs.push(StrokeSeg::Line(next_start));
        }
        Join::Round => {
            segs.extend(cubic_arc_segments(vertex, prev_end, next_start, halfw));
        }
        Join::Miter => {
            if let Some(p) = miter_point(prev_end, next_start, vertex, halfw, miter_limit) {
                segs.push(StrokeSeg::Line(p));
            }
            segs.push(StrokeSeg::Line(next_start));
        }
    }
}

/// Intersection of the two offset-segment directions extended from
/// `prev_end`/`next_start`, rejected in favor of a bevel when the resulting
/// miter length exceeds `miter_limit * halfw` (the half-width ratio
/// convention).
fn miter_point(prev_end: Point, next_start: Point, vertex: Point, halfw: f64, miter_limit: f64) -> Option<Point> {
    let d1 = prev_end - vertex;
    let d2 = next_start - vertex;
    let bisector = (d1.normalize() + d2.normalize());
    let blen = bisector.hypot();
    if blen < 1e-9 {
        return None;
    }
    let bisector = bisector.normalize();
    // cos(half angle between the two offset directions).
    let cos_half = bisector.dot(d1.normalize());
    if cos_half.abs() < 1e-9 {
        return None;
    }
    let miter_len = halfw / cos_half;
    if (miter_len / halfw).abs() > miter_limit {
        return None;
    }
    Some(vertex + bisector * miter_len)
}

/// Approximate the shorter arc from `from` to `to` (both assumed to lie on a
/// circle of radius `radius` centered at `center`) with one cubic Bezier per
/// quarter-turn-or-less span, via `k = (4/3) * tan(sweep/4)` generalized to
/// each chunk's own sweep angle. Unlike a polyline chord, every chunk's
/// endpoints lie exactly on the circle.
fn cubic_arc_segments(center: Point, from: Point, to: Point, radius: f64) -> Vec<StrokeSeg> {
    let a0 = (from - center).y.atan2((from - center).x);
    let mut a1 = (to - center).y.atan2((to - center).x);

    let cross = (from - center).cross(to - center);
    if cross >= 0.0 && a1 < a0 {
        a1 += std::f64::consts::TAU;
    } else if cross < 0.0 && a1 > a0 {
        a1 -= std::f64::consts::TAU;
    }

    let sweep = a1 - a0;
    if sweep.abs() < 1e-9 {
        return Vec::new();
    }

    let chunks = (sweep.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / chunks as f64;

    let mut segs = Vec::with_capacity(chunks);
    let mut prev = from;
    let mut theta = a0;
    for i in 0..chunks {
        let theta_next = if i + 1 == chunks { a1 } else { theta + step };
        let delta = theta_next - theta;
        let p3 = center + Point::new(theta_next.cos(), theta_next.sin()) * radius;
        let k = (4.0 / 3.0) * (delta / 4.0).tan();
        let t0 = Point::new(-theta.sin(), theta.cos()) * (k * radius);
        let t3 = Point::new(-theta_next.sin(), theta_next.cos()) * (k * radius);
        segs.push(StrokeSeg::Cubic(prev + t0, p3 - t3, p3));
        prev = p3;
        theta = theta_next;
    }
    segs
}

/// Cut a polyline into its dash-on segments by arc length, starting `offset`
/// units into the pattern. Returns a list of open polylines; a closed input
/// is treated as one open loop starting at `points[0]` once dashed.
fn dash_polyline(points: &[Point], closed: bool, pattern: &[f64], offset: f64) -> Vec<Vec<Point>> {
    let total: f64 = pattern.iter().sum();
    if total <= 0.0 {
        return vec![points.to_vec()];
    }

    let mut loop_points = points.to_vec();
    if closed {
        loop_points.push(points[0]);
    }

    let mut phase = offset.rem_euclid(total);
    let mut idx = 0;
    while phase >= pattern[idx] {
        phase -= pattern[idx];
        idx = (idx + 1) % pattern.len();
    }
    let mut on = idx % 2 == 0;
    let mut remaining = pattern[idx] - phase;

    let mut dashes = Vec::new();
    let mut current: Vec<Point> = if on { vec![loop_points[0]] } else { Vec::new() };

    for pair in loop_points.windows(2) {
        let (mut a, b) = (pair[0], pair[1]);
        let mut seg_len = a.distance(b);
        while seg_len > 0.0 {
            if remaining >= seg_len {
                remaining -= seg_len;
                if on {
                    current.push(b);
                }
                a = b;
                seg_len = 0.0;
            } else {
                let t = remaining / seg_len;
                let split = a.lerp(b, t);
                if on {
                    current.push(split);
                    dashes.push(std::mem::take(&mut current));
                } else {
                    current = vec![split];
                }
                a = split;
                seg_len = a.distance(b);
                on = !on;
                idx = (idx + 1) % pattern.len();
                remaining = pattern[idx];
            }
        }
    }
    if on && current.len() >= 2 {
        dashes.push(current);
    }
    dashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{flatten_path, DEFAULT_TOLERANCE};

    fn flatten(path: &Path) -> (Vec<Vec<FlatLine>>, Vec<bool>) {
        let subpaths = flatten_path(path, DEFAULT_TOLERANCE);
        let closed = vec![false; subpaths.len()];
        (subpaths, closed)
    }

    #[test]
    fn straight_segment_produces_rectangle_outline() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(10.0, 0.0));
        let (subpaths, closed) = flatten(&p);
        let style = StrokeStyle { width: 2.0, cap: Cap::Butt, ..StrokeStyle::default() };
        let out = stroke_polylines(&subpaths, &style, &closed);
        let bbox = out.bounding_box().unwrap();
        assert!((bbox.height() - 2.0).abs() < 1e-6);
        assert!((bbox.width() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn square_cap_extends_bbox_by_half_width() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(10.0, 0.0));
        let (subpaths, closed) = flatten(&p);
        let style = StrokeStyle { width: 2.0, cap: Cap::Square, ..StrokeStyle::default() };
        let out = stroke_polylines(&subpaths, &style, &closed);
        let bbox = out.bounding_box().unwrap();
        assert!((bbox.width() - 11.0).abs() < 1e-6);
    }

    #[test]
    fn round_cap_produces_extra_vertices() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(10.0, 0.0));
        let (subpaths, closed) = flatten(&p);
        let style = StrokeStyle { width: 2.0, cap: Cap::Round, ..StrokeStyle::default() };
        let out = stroke_polylines(&subpaths, &style, &closed);
        assert!(out.len() > 6);
    }

    #[test]
    fn round_cap_bbox_stays_within_radius() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(10.0, 0.0));
        let (subpaths, closed) = flatten(&p);
        let style = StrokeStyle { width: 2.0, cap: Cap::Round, ..StrokeStyle::default() };
        let out = stroke_polylines(&subpaths, &style, &closed);
        let bbox = out.bounding_box().unwrap();
        // A round cap of half-width 1 extends the bbox by ~1 past each end,
        // same as a square cap, but via an arc rather than a sharp corner.
        assert!((bbox.width() - 12.0).abs() < 0.05);
        assert!((bbox.height() - 2.0).abs() < 0.05);
    }

    #[test]
    fn round_join_uses_cubic_arcs_without_cutting_corner() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(10.0, 0.0));
        p.line_to(Point::new(10.0, 10.0));
        let (subpaths, closed) = flatten(&p);
        let style = StrokeStyle { width: 2.0, join: Join::Round, cap: Cap::Butt, ..StrokeStyle::default() };
        let out = stroke_polylines(&subpaths, &style, &closed);
        let bbox = out.bounding_box().unwrap();
        // The round join's outer arc should reach past the sharp corner at
        // (11, -1), unlike a bevel or miter cut-off.
        assert!(bbox.max.x >= 10.9);
    }

    #[test]
    fn dash_pattern_splits_into_multiple_subpaths() {
        let mut p = Path::new();
        p.move_to(Point::new(0.0, 0.0));
        p.line_to(Point::new(20.0, 0.0));
        let (subpaths, _) = flatten(&p);
        let lines = &subpaths[0];
        let points = polyline_points(lines);
        let dashes = dash_polyline(&points, false, &[4.0, 4.0], 0.0);
        assert_eq!(dashes.len(), 3);
    }

    #[test]
    fn hairline_threshold() {
        assert!(is_hairline(1.0));
        assert!(is_hairline(0.5));
        assert!(!is_hairline(1.5));
    }
}
