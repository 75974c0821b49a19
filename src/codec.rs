// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image codec delegation. Encoding/decoding pixel buffers to file formats is
//! explicitly out of the core's scope (SPEC_FULL.md §12) — this module is
//! the seam a caller plugs a concrete codec into. PNG is implemented behind
//! the `png-codec` feature, matching the teacher's own dev-dependency use of
//! the `png` crate; JPEG is declared but not implemented (see DESIGN.md's
//! Open Question resolution 4 — no JPEG crate appears anywhere in the pack).

use crate::error::RasterError;
use crate::pixmap::Pixmap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

pub trait Codec {
    fn format(&self) -> ImageFormat;
    fn encode(&self, pixmap: &Pixmap) -> Result<Vec<u8>, RasterError>;
    fn decode(&self, bytes: &[u8]) -> Result<Pixmap, RasterError>;
}

pub struct JpegCodec;

impl Codec for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, _pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
        Err(RasterError::EncodeFailure("JPEG encoding is not implemented".into()))
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Pixmap, RasterError> {
        Err(RasterError::EncodeFailure("JPEG decoding is not implemented".into()))
    }
}

#[cfg(feature = "png-codec")]
pub use png_impl::PngCodec;

#[cfg(feature = "png-codec")]
mod png_impl {
    use super::*;
    use std::io::Cursor;

    pub struct PngCodec;

    impl Codec for PngCodec {
        fn format(&self) -> ImageFormat {
            ImageFormat::Png
        }

        fn encode(&self, pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
            let mut straight = pixmap.clone();
            straight.unpremultiply();

            let mut out = Vec::new();
            {
                let mut encoder = png::Encoder::new(&mut out, pixmap.width(), pixmap.height());
                encoder.set_color(png::ColorType::Rgba);
                encoder.set_depth(png::BitDepth::Eight);
                let mut writer = encoder
                    .write_header()
                    .map_err(|e| RasterError::EncodeFailure(e.to_string()))?;
                writer
                    .write_image_data(straight.data())
                    .map_err(|e| RasterError::EncodeFailure(e.to_string()))?;
            }
            Ok(out)
        }

        fn decode(&self, bytes: &[u8]) -> Result<Pixmap, RasterError> {
            let decoder = png::Decoder::new(Cursor::new(bytes));
            let mut reader = decoder.read_info().map_err(|e| RasterError::EncodeFailure(e.to_string()))?;
            let mut buf = vec![0u8; reader.output_buffer_size()];
            let info = reader.next_frame(&mut buf).map_err(|e| RasterError::EncodeFailure(e.to_string()))?;

            let mut pixmap = Pixmap::new(info.width, info.height)?;
            // `next_frame` always yields RGBA8 data for an RGBA-color-type PNG;
            // premultiply each pixel on the way into our premultiplied buffer.
            for (i, px) in buf[..info.buffer_size()].chunks_exact(4).enumerate() {
                let x = (i as u32) % info.width;
                let y = (i as u32) / info.width;
                let color = crate::color::Rgba::from_rgba8(px[0], px[1], px[2], px[3]);
                pixmap.set_pixel(x, y, color);
            }
            Ok(pixmap)
        }
    }
}

#[cfg(all(test, feature = "png-codec"))]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn png_round_trips_a_solid_pixmap() {
        let mut pm = Pixmap::new(4, 4).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                pm.set_pixel(x, y, Rgba::new(1.0, 0.0, 0.0, 1.0));
            }
        }
        let codec = PngCodec;
        let bytes = codec.encode(&pm).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
        let c = decoded.get_pixel(0, 0);
        assert!((c.r - 1.0).abs() < 0.02);
    }
}

#[cfg(test)]
mod jpeg_tests {
    use super::*;

    #[test]
    fn jpeg_codec_reports_unimplemented() {
        let codec = JpegCodec;
        let pm = Pixmap::new(2, 2).unwrap();
        assert!(matches!(codec.encode(&pm), Err(RasterError::EncodeFailure(_))));
        assert!(matches!(codec.decode(&[]), Err(RasterError::EncodeFailure(_))));
    }
}
