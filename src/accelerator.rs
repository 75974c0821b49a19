// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The accelerator interface: an optional GPU (or otherwise non-CPU)
//! backend a [`crate::context::RenderContext`] can delegate to, falling back
//! to the CPU path on any `FallbackToCpu` response. No concrete accelerator
//! ships in this crate (see SPEC_FULL.md §12) — this is the interface other
//! crates implement against.

use crate::error::RasterError;
use crate::paint::Paint;
use crate::path::Path;
use crate::pixmap::Pixmap;
use crate::sdf::Shape;

/// A capability bit a backend advertises via [`Accelerator::can_accelerate`]:
/// general path fill/stroke, or one of the SDF fast paths (component F).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccelOp {
    Fill,
    Stroke,
    CircleSdf,
    RRectSdf,
}

pub trait Accelerator: Send + Sync {
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), RasterError>;

    fn close(&mut self) -> Result<(), RasterError>;

    /// Whether this backend is willing to handle the given capability at
    /// all, a cheap pre-check before committing to a potentially expensive
    /// dispatch.
    fn can_accelerate(&self, op: AccelOp) -> bool;

    fn fill_path(&mut self, path: &Path, paint: &Paint, target: &mut Pixmap) -> Result<(), RasterError>;

    fn stroke_path(&mut self, path: &Path, paint: &Paint, target: &mut Pixmap) -> Result<(), RasterError>;

    fn fill_shape(&mut self, shape: &Shape, paint: &Paint, target: &mut Pixmap) -> Result<(), RasterError>;

    fn stroke_shape(&mut self, shape: &Shape, paint: &Paint, target: &mut Pixmap) -> Result<(), RasterError>;

    fn flush(&mut self) -> Result<(), RasterError>;
}

/// A single-slot accelerator registry. Only one backend can be active at a
/// time; registering a new one replaces (and closes) the previous.
#[derive(Default)]
pub struct AcceleratorRegistry {
    active: Option<Box<dyn Accelerator>>,
}

impl AcceleratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mut backend: Box<dyn Accelerator>) -> Result<(), RasterError> {
        if let Some(mut prev) = self.active.take() {
            prev.close()?;
        }
        backend.init()?;
        self.active = Some(backend);
        Ok(())
    }

    pub fn unregister(&mut self) -> Result<(), RasterError> {
        if let Some(mut backend) = self.active.take() {
            backend.close()?;
        }
        Ok(())
    }

    pub fn active(&self) -> Option<&dyn Accelerator> {
        self.active.as_deref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Box<dyn Accelerator>> {
        self.active.as_mut()
    }

    /// Try the active accelerator for a fill; a `FallbackToCpu` (or no
    /// accelerator at all) tells the caller to use the CPU pipeline instead
    /// — never treated as a hard error.
    pub fn try_fill_path(&mut self, path: &Path, paint: &Paint, target: &mut Pixmap) -> Result<bool, RasterError> {
        match &mut self.active {
            Some(backend) if backend.can_accelerate(AccelOp::Fill) => match backend.fill_path(path, paint, target) {
                Ok(()) => Ok(true),
                Err(RasterError::FallbackToCpu) => {
                    log::warn!("accelerator '{}' declined fill, falling back to CPU", backend.name());
                    Ok(false)
                }
                Err(e) => Err(e),
            },
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DeclineAll;
    impl Accelerator for DeclineAll {
        fn name(&self) -> &str {
            "decline-all"
        }
        fn init(&mut self) -> Result<(), RasterError> {
            Ok(())
        }
        fn close(&mut self) -> Result<(), RasterError> {
            Ok(())
        }
        fn can_accelerate(&self, _op: AccelOp) -> bool {
            true
        }
        fn fill_path(&mut self, _path: &Path, _paint: &Paint, _target: &mut Pixmap) -> Result<(), RasterError> {
            Err(RasterError::FallbackToCpu)
        }
        fn stroke_path(&mut self, _path: &Path, _paint: &Paint, _target: &mut Pixmap) -> Result<(), RasterError> {
            Err(RasterError::FallbackToCpu)
        }
        fn fill_shape(&mut self, _shape: &Shape, _paint: &Paint, _target: &mut Pixmap) -> Result<(), RasterError> {
            Err(RasterError::FallbackToCpu)
        }
        fn stroke_shape(&mut self, _shape: &Shape, _paint: &Paint, _target: &mut Pixmap) -> Result<(), RasterError> {
            Err(RasterError::FallbackToCpu)
        }
        fn flush(&mut self) -> Result<(), RasterError> {
            Ok(())
        }
    }

    #[test]
    fn decline_falls_back_to_cpu_without_erroring() {
        let mut registry = AcceleratorRegistry::new();
        registry.register(Box::new(DeclineAll)).unwrap();
        let mut pm = Pixmap::new(4, 4).unwrap();
        let path = Path::new();
        let paint = Paint::default();
        let used = registry.try_fill_path(&path, &paint, &mut pm).unwrap();
        assert!(!used);
    }

    #[test]
    fn no_registered_backend_returns_false() {
        let mut registry = AcceleratorRegistry::new();
        let mut pm = Pixmap::new(4, 4).unwrap();
        let path = Path::new();
        let paint = Paint::default();
        assert!(!registry.try_fill_path(&path, &paint, &mut pm).unwrap());
    }
}
