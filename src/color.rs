// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Color types and the sRGB <-> linear-light conversion tables used for
//! gradient stop interpolation.
//!
//! Storage convention (see DESIGN.md Open Question 2): [`Rgba`] is the
//! straight-alpha, author-facing color type. Every pixel buffer in the crate
//! stores premultiplied alpha exclusively; conversion only happens at the
//! `Rgba` boundary.

use std::sync::OnceLock;

/// A straight-alpha color with `f32` components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn to_premultiplied(self) -> Premultiplied {
        Premultiplied {
            r: self.r * self.a,
            g: self.g * self.a,
            b: self.b * self.a,
            a: self.a,
        }
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// A premultiplied-alpha color, the convention every pixel buffer uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Premultiplied {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Premultiplied {
    pub fn to_straight(self) -> Rgba {
        if self.a <= 0.0 {
            Rgba::TRANSPARENT
        } else {
            Rgba {
                r: (self.r / self.a).min(1.0),
                g: (self.g / self.a).min(1.0),
                b: (self.b / self.a).min(1.0),
                a: self.a,
            }
        }
    }

    /// Fast `+0.5` rounding to 8-bit components, mirroring the teacher's
    /// `ColorExt::to_rgba8_fast`.
    pub fn to_rgba8_fast(self) -> [u8; 4] {
        [
            round_u8_fast(self.r),
            round_u8_fast(self.g),
            round_u8_fast(self.b),
            round_u8_fast(self.a),
        ]
    }
}

fn round_u8_fast(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Per spec: `round(clamp(x * 255, 0, 255))`, using round-half-to-even-free
/// standard rounding (not the fast `+0.5` shortcut above, used where exact
/// rounding matters, e.g. `Pixmap::get_pixel`).
pub fn round_u8_exact(x: f32) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

const SRGB_TO_LINEAR_SIZE: usize = 256;
const LINEAR_TO_SRGB_SIZE: usize = 4096;

fn srgb_to_linear_scalar(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb_scalar(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn srgb_to_linear_table() -> &'static [f32; SRGB_TO_LINEAR_SIZE] {
    static TABLE: OnceLock<[f32; SRGB_TO_LINEAR_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0.0f32; SRGB_TO_LINEAR_SIZE];
        for (i, v) in t.iter_mut().enumerate() {
            *v = srgb_to_linear_scalar(i as f32 / 255.0);
        }
        t
    })
}

fn linear_to_srgb_table() -> &'static [f32; LINEAR_TO_SRGB_SIZE] {
    static TABLE: OnceLock<[f32; LINEAR_TO_SRGB_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0.0f32; LINEAR_TO_SRGB_SIZE];
        for (i, v) in t.iter_mut().enumerate() {
            *v = linear_to_srgb_scalar(i as f32 / (LINEAR_TO_SRGB_SIZE - 1) as f32);
        }
        t
    })
}

/// Convert an 8-bit sRGB channel value (expressed as `[0, 1]`) to linear
/// light using the 256-entry forward LUT.
pub fn srgb_to_linear(c: f32) -> f32 {
    let idx = (c.clamp(0.0, 1.0) * 255.0).round() as usize;
    srgb_to_linear_table()[idx.min(SRGB_TO_LINEAR_SIZE - 1)]
}

/// Convert a linear-light channel value back to sRGB using the 4096-entry
/// inverse LUT, for gradient stop interpolation done in linear space.
pub fn linear_to_srgb(c: f32) -> f32 {
    let idx = (c.clamp(0.0, 1.0) * (LINEAR_TO_SRGB_SIZE - 1) as f32).round() as usize;
    linear_to_srgb_table()[idx.min(LINEAR_TO_SRGB_SIZE - 1)]
}

/// A color converted to linear light, interpolated, then converted back —
/// the path gradient stops use when linear interpolation is requested.
pub fn lerp_linear_light(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let al = [srgb_to_linear(a.r), srgb_to_linear(a.g), srgb_to_linear(a.b)];
    let bl = [srgb_to_linear(b.r), srgb_to_linear(b.g), srgb_to_linear(b.b)];
    let lerp = |x: f32, y: f32| x + (y - x) * t;
    Rgba {
        r: linear_to_srgb(lerp(al[0], bl[0])),
        g: linear_to_srgb(lerp(al[1], bl[1])),
        b: linear_to_srgb(lerp(al[2], bl[2])),
        a: a.a + (b.a - a.a) * t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_round_trips() {
        let c = Rgba::new(0.5, 0.25, 0.75, 0.5);
        let pm = c.to_premultiplied();
        let back = pm.to_straight();
        assert!((back.r - c.r).abs() < 1e-5);
        assert!((back.g - c.g).abs() < 1e-5);
        assert!((back.b - c.b).abs() < 1e-5);
        assert!((back.a - c.a).abs() < 1e-5);
    }

    #[test]
    fn fully_transparent_unpremultiplies_to_transparent() {
        let pm = Premultiplied { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
        assert_eq!(pm.to_straight(), Rgba::TRANSPARENT);
    }

    #[test]
    fn srgb_round_trip_is_close() {
        for i in 0..=255u8 {
            let c = i as f32 / 255.0;
            let back = linear_to_srgb(srgb_to_linear(c));
            assert!((back - c).abs() < 0.01, "{i}: {back} vs {c}");
        }
    }

    #[test]
    fn rounding_matches_spec_formula() {
        assert_eq!(round_u8_exact(1.0), 255);
        assert_eq!(round_u8_exact(0.0), 0);
        assert_eq!(round_u8_exact(2.0), 255);
        assert_eq!(round_u8_exact(-1.0), 0);
    }
}
