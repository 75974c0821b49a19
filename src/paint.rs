// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Brushes and the paint descriptor that ties a brush to a fill rule and
//! optional stroke style.

use crate::color::{lerp_linear_light, Rgba};
use crate::geom::Point;
use crate::stroke::StrokeStyle;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// Whether a given winding number is considered "inside" under this
    /// rule. `EvenOdd` maps winding through a triangle wave (odd = inside).
    pub fn active(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendMode {
    Pad,
    Repeat,
    Reflect,
}

impl ExtendMode {
    /// Map an arbitrary gradient parameter `t` into `[0, 1]` per this mode.
    pub fn apply(self, t: f32) -> f32 {
        match self {
            ExtendMode::Pad => t.clamp(0.0, 1.0),
            ExtendMode::Repeat => t.rem_euclid(1.0),
            ExtendMode::Reflect => {
                let period = t.rem_euclid(2.0);
                if period <= 1.0 {
                    period
                } else {
                    2.0 - period
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

/// A custom brush sampling function: given a point in the brush's local
/// space, return a straight-alpha color. Absorbs the teacher's placeholder
/// `Pattern` type into a first-class brush variant (DESIGN.md §11).
pub type CustomSampler = Arc<dyn Fn(Point) -> Rgba + Send + Sync>;

#[derive(Clone)]
pub enum Brush {
    Solid(Rgba),
    LinearGradient {
        start: Point,
        end: Point,
        stops: Vec<GradientStop>,
        extend: ExtendMode,
    },
    /// A two-circle (conical) radial gradient: interpolates from the focus
    /// circle (`focus`, `start_radius`) to the end circle (`center`,
    /// `radius`) as `t` sweeps `0..1`, the same data model Skia/SVG/CSS use
    /// for radial gradients. A concentric gradient is just the special case
    /// `focus == center, start_radius == 0.0`.
    RadialGradient {
        center: Point,
        radius: f64,
        focus: Point,
        start_radius: f64,
        stops: Vec<GradientStop>,
        extend: ExtendMode,
    },
    SweepGradient {
        center: Point,
        start_angle: f64,
        end_angle: f64,
        stops: Vec<GradientStop>,
        extend: ExtendMode,
    },
    Custom(CustomSampler),
}

impl std::fmt::Debug for Brush {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Brush::Solid(c) => f.debug_tuple("Solid").field(c).finish(),
            Brush::LinearGradient { start, end, stops, extend } => f
                .debug_struct("LinearGradient")
                .field("start", start)
                .field("end", end)
                .field("stops", stops)
                .field("extend", extend)
                .finish(),
            Brush::RadialGradient { center, radius, focus, start_radius, stops, extend } => f
                .debug_struct("RadialGradient")
                .field("center", center)
                .field("radius", radius)
                .field("focus", focus)
                .field("start_radius", start_radius)
                .field("stops", stops)
                .field("extend", extend)
                .finish(),
            Brush::SweepGradient { center, start_angle, end_angle, stops, extend } => f
                .debug_struct("SweepGradient")
                .field("center", center)
                .field("start_angle", start_angle)
                .field("end_angle", end_angle)
                .field("stops", stops)
                .field("extend", extend)
                .finish(),
            Brush::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl From<Rgba> for Brush {
    fn from(c: Rgba) -> Self {
        Brush::Solid(c)
    }
}

impl Brush {
    /// The brush's alpha at full opacity, used as a fast upper bound before
    /// sampling (mirrors the teacher's `Paint::alpha`/`Pattern::alpha`).
    pub fn alpha_hint(&self) -> f32 {
        match self {
            Brush::Solid(c) => c.a,
            Brush::LinearGradient { stops, .. }
            | Brush::RadialGradient { stops, .. }
            | Brush::SweepGradient { stops, .. } => {
                stops.iter().map(|s| s.color.a).fold(0.0, f32::max)
            }
            Brush::Custom(_) => 1.0,
        }
    }

    /// Sample the brush's color at a point in user space.
    pub fn color_at(&self, p: Point) -> Rgba {
        match self {
            Brush::Solid(c) => *c,
            Brush::LinearGradient { start, end, stops, extend } => {
                let axis = *end - *start;
                let len2 = axis.dot(axis);
                let t = if len2 > 0.0 { (p - *start).dot(axis) / len2 } else { 0.0 };
                sample_stops(stops, extend.apply(t as f32))
            }
            Brush::RadialGradient { center, radius, focus, start_radius, stops, extend } => {
                let t = radial_gradient_t(p, *focus, *start_radius, *center, *radius);
                sample_stops(stops, extend.apply(t as f32))
            }
            Brush::SweepGradient { center, start_angle, end_angle, stops, extend } => {
                let v = p - *center;
                let mut angle = v.y.atan2(v.x);
                if angle < *start_angle {
                    angle += std::f64::consts::TAU;
                }
                let span = end_angle - start_angle;
                let t = if span.abs() > 1e-9 { (angle - start_angle) / span } else { 0.0 };
                sample_stops(stops, extend.apply(t as f32))
            }
            Brush::Custom(f) => f(p),
        }
    }
}

fn sample_stops(stops: &[GradientStop], t: f32) -> Rgba {
    if stops.is_empty() {
        return Rgba::TRANSPARENT;
    }
    if t <= stops[0].offset {
        return stops[0].color;
    }
    if t >= stops[stops.len() - 1].offset {
        return stops[stops.len() - 1].color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.offset && t <= b.offset {
            let span = b.offset - a.offset;
            let local_t = if span > 0.0 { (t - a.offset) / span } else { 0.0 };
            return lerp_linear_light(a.color, b.color, local_t);
        }
    }
    stops[stops.len() - 1].color
}

/// Solve for the gradient parameter `t` of a two-circle conical radial
/// gradient at `p`: the largest `t` for which `p` lies on the circle that
/// linearly interpolates center/radius from `(focus, start_radius)` at
/// `t=0` to `(center, radius)` at `t=1`, with radius staying non-negative
/// along the way. Quadratic in `t`; degenerates to a linear solve when the
/// two circles have equal radius (a pure translation of the focus).
fn radial_gradient_t(p: Point, focus: Point, start_radius: f64, center: Point, radius: f64) -> f64 {
    let dc = center - focus;
    let dr = radius - start_radius;
    let pd = p - focus;

    let a = dc.dot(dc) - dr * dr;
    let b = -2.0 * (pd.dot(dc) + start_radius * dr);
    let c = pd.dot(pd) - start_radius * start_radius;

    if a.abs() < 1e-9 {
        return if b.abs() < 1e-9 { 0.0 } else { -c / b };
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return 0.0;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = (-b + sqrt_disc) / (2.0 * a);
    let t1 = (-b - sqrt_disc) / (2.0 * a);

    let valid = |t: f64| start_radius + t * dr >= 0.0;
    match (valid(t0), valid(t1)) {
        (true, true) => t0.max(t1),
        (true, false) => t0,
        (false, true) => t1,
        (false, false) => 0.0,
    }
}

/// A fill/stroke paint descriptor: a brush plus the fill rule used when
/// filling, and an optional stroke style when stroking.
#[derive(Clone, Debug)]
pub struct Paint {
    pub brush: Brush,
    pub fill_rule: FillRule,
    pub stroke: Option<StrokeStyle>,
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Paint { brush: Brush::Solid(color), fill_rule: FillRule::NonZero, ..Default::default() }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Paint { brush: Brush::Solid(Rgba::BLACK), fill_rule: FillRule::NonZero, stroke: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rule_nonzero_active_for_nonzero_winding() {
        assert!(FillRule::NonZero.active(1));
        assert!(FillRule::NonZero.active(-3));
        assert!(!FillRule::NonZero.active(0));
    }

    #[test]
    fn fill_rule_evenodd_triangle_wave() {
        assert!(FillRule::EvenOdd.active(1));
        assert!(!FillRule::EvenOdd.active(2));
        assert!(FillRule::EvenOdd.active(-1));
    }

    #[test]
    fn extend_repeat_wraps() {
        assert!((ExtendMode::Repeat.apply(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn extend_reflect_bounces() {
        assert!((ExtendMode::Reflect.apply(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn linear_gradient_endpoints_match_stops() {
        let brush = Brush::LinearGradient {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
            stops: vec![
                GradientStop { offset: 0.0, color: Rgba::BLACK },
                GradientStop { offset: 1.0, color: Rgba::WHITE },
            ],
            extend: ExtendMode::Pad,
        };
        assert_eq!(brush.color_at(Point::new(0.0, 0.0)), Rgba::BLACK);
        assert_eq!(brush.color_at(Point::new(10.0, 0.0)), Rgba::WHITE);
    }

    #[test]
    fn solid_alpha_hint_matches_color() {
        let brush = Brush::Solid(Rgba::new(1.0, 1.0, 1.0, 0.4));
        assert!((brush.alpha_hint() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn concentric_radial_gradient_matches_distance_ratio() {
        let brush = Brush::RadialGradient {
            center: Point::new(0.0, 0.0),
            radius: 10.0,
            focus: Point::new(0.0, 0.0),
            start_radius: 0.0,
            stops: vec![
                GradientStop { offset: 0.0, color: Rgba::BLACK },
                GradientStop { offset: 1.0, color: Rgba::WHITE },
            ],
            extend: ExtendMode::Pad,
        };
        assert_eq!(brush.color_at(Point::new(0.0, 0.0)), Rgba::BLACK);
        assert_eq!(brush.color_at(Point::new(10.0, 0.0)), Rgba::WHITE);
    }

    #[test]
    fn offset_focus_radial_gradient_reaches_end_circle() {
        let brush = Brush::RadialGradient {
            center: Point::new(0.0, 0.0),
            radius: 10.0,
            focus: Point::new(3.0, 0.0),
            start_radius: 0.0,
            stops: vec![
                GradientStop { offset: 0.0, color: Rgba::BLACK },
                GradientStop { offset: 1.0, color: Rgba::WHITE },
            ],
            extend: ExtendMode::Pad,
        };
        assert_eq!(brush.color_at(Point::new(3.0, 0.0)), Rgba::BLACK);
        // Any point on the t=1 circle (radius 10 about the origin) should
        // land at the far end of the ramp.
        let c = brush.color_at(Point::new(10.0, 0.0));
        assert_eq!(c, Rgba::WHITE);
    }
}
