// Copyright 2024 the Piet Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The crate's single error type, covering every fallible public entry
//! point. Out-of-bounds pixel access is deliberately not a variant here: per
//! the failure-kind table, it is silently clipped rather than surfaced.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RasterError {
    #[error("invalid pixmap dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("engine already closed")]
    Closed,

    #[error("image encode/decode failure: {0}")]
    EncodeFailure(String),

    #[error("accelerator backend error: {0}")]
    AcceleratorBackend(String),

    #[error("accelerator declined, falling back to CPU")]
    FallbackToCpu,
}
