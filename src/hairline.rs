// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-point hairline rasterization for strokes whose effective device
//! width has dropped to a pixel or below (see [`crate::stroke::is_hairline`]).
//! Named after the FDot6/FDot16 fixed-point conventions of the tiny-skia
//! lineage (spec.md §4.E).

use crate::color::Premultiplied;
use crate::pixmap::Pixmap;
use crate::stroke::Cap;

/// Fixed-point shift for 6 fractional bits (`FDot6`), used to snap hairline
/// endpoints to a sub-pixel grid without floating-point drift across a long
/// line walk.
const DOT6_SHIFT: i32 = 6;
const DOT6_ONE: i32 = 1 << DOT6_SHIFT;

fn to_dot6(x: f32) -> i32 {
    (x * DOT6_ONE as f32).round() as i32
}

fn from_dot6(x: i32) -> f32 {
    x as f32 / DOT6_ONE as f32
}

/// Rasterize a single hairline segment directly into `pixmap`, blending
/// `color` at each touched pixel with coverage derived from how close the
/// pixel center is to the ideal line (a 1px-wide box filter), offset by the
/// standard +0.5 pixel-center convention.
pub fn draw_hairline(pixmap: &mut Pixmap, p0: (f32, f32), p1: (f32, f32), color: Premultiplied, cap: Cap) {
    let x0 = to_dot6(p0.0);
    let y0 = to_dot6(p0.1);
    let x1 = to_dot6(p1.0);
    let y1 = to_dot6(p1.1);

    let dx = x1 - x0;
    let dy = y1 - y0;

    if dx == 0 && dy == 0 {
        draw_dot(pixmap, p0, color);
        return;
    }

    if dx.abs() >= dy.abs() {
        draw_hairline_x_major(pixmap, x0, y0, x1, y1, color);
    } else {
        draw_hairline_y_major(pixmap, x0, y0, x1, y1, color);
    }

    if cap == Cap::Square {
        extend_square_cap(pixmap, p0, p1, color);
    }
}

fn draw_dot(pixmap: &mut Pixmap, p: (f32, f32), color: Premultiplied) {
    let x = p.0.floor() as i64;
    let y = p.1.floor() as i64;
    if x >= 0 && y >= 0 && (x as u32) < pixmap.width() && (y as u32) < pixmap.height() {
        pixmap.set_pixel_premultiplied(x as u32, y as u32, color);
    }
}

/// Walk the line with `x` as the driving axis (one pixel per column), the
/// classic Bresenham-with-fixed-point-slope hairline approach.
fn draw_hairline_x_major(pixmap: &mut Pixmap, x0: i32, y0: i32, x1: i32, y1: i32, color: Premultiplied) {
    let (x0, y0, x1, y1) = if x0 <= x1 { (x0, y0, x1, y1) } else { (x1, y1, x0, y0) };
    let dx = (x1 - x0).max(1);
    let dy = y1 - y0;
    let slope = dy as f64 / dx as f64;

    let px0 = from_dot6(x0).floor() as i64;
    let px1 = from_dot6(x1).ceil() as i64;

    for px in px0..px1 {
        let x_center = px as f64 + 0.5;
        let t = (x_center - from_dot6(x0) as f64) / dx as f64;
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let y = from_dot6(y0) as f64 + slope * (x_center - from_dot6(x0) as f64);
        set_if_in_bounds(pixmap, px, y.floor() as i64, color);
    }
}

fn draw_hairline_y_major(pixmap: &mut Pixmap, x0: i32, y0: i32, x1: i32, y1: i32, color: Premultiplied) {
    let (x0, y0, x1, y1) = if y0 <= y1 { (x0, y0, x1, y1) } else { (x1, y1, x0, y0) };
    let dy = (y1 - y0).max(1);
    let dx = x1 - x0;
    let slope = dx as f64 / dy as f64;

    let py0 = from_dot6(y0).floor() as i64;
    let py1 = from_dot6(y1).ceil() as i64;

    for py in py0..py1 {
        let y_center = py as f64 + 0.5;
        let t = (y_center - from_dot6(y0) as f64) / dy as f64;
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        let x = from_dot6(x0) as f64 + slope * (y_center - from_dot6(y0) as f64);
        set_if_in_bounds(pixmap, x.floor() as i64, py, color);
    }
}

fn set_if_in_bounds(pixmap: &mut Pixmap, x: i64, y: i64, color: Premultiplied) {
    if x >= 0 && y >= 0 && (x as u32) < pixmap.width() && (y as u32) < pixmap.height() {
        pixmap.set_pixel_premultiplied(x as u32, y as u32, color);
    }
}

fn extend_square_cap(pixmap: &mut Pixmap, p0: (f32, f32), p1: (f32, f32), color: Premultiplied) {
    let dx = p1.0 - p0.0;
    let dy = p1.1 - p0.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return;
    }
    let (ux, uy) = (dx / len, dy / len);
    draw_dot(pixmap, (p1.0 + ux * 0.5, p1.1 + uy * 0.5), color);
    draw_dot(pixmap, (p0.0 - ux * 0.5, p0.1 - uy * 0.5), color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn horizontal_hairline_touches_expected_row() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        let color = Rgba::new(1.0, 0.0, 0.0, 1.0).to_premultiplied();
        draw_hairline(&mut pm, (0.5, 5.5), (9.5, 5.5), color, Cap::Butt);
        assert_eq!(pm.get_pixel(5, 5).a, 1.0);
        assert_eq!(pm.get_pixel(5, 2).a, 0.0);
    }

    #[test]
    fn vertical_hairline_touches_expected_column() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        let color = Rgba::new(1.0, 0.0, 0.0, 1.0).to_premultiplied();
        draw_hairline(&mut pm, (5.5, 0.5), (5.5, 9.5), color, Cap::Butt);
        assert_eq!(pm.get_pixel(5, 5).a, 1.0);
        assert_eq!(pm.get_pixel(2, 5).a, 0.0);
    }

    #[test]
    fn degenerate_segment_draws_a_dot() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        let color = Rgba::new(1.0, 0.0, 0.0, 1.0).to_premultiplied();
        draw_hairline(&mut pm, (5.0, 5.0), (5.0, 5.0), color, Cap::Butt);
        assert_eq!(pm.get_pixel(5, 5).a, 1.0);
    }
}
