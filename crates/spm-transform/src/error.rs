//! Transform error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// Too few samples for the requested operation.
    #[error("insufficient samples: need at least {required}, found {found}")]
    InsufficientSamples { required: usize, found: usize },

    #[error("x has {x} samples but y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("input contains a non-finite value at index {index}")]
    NonFinite { index: usize },

    /// Two neighbouring x values coincide, so a slope is undefined.
    #[error("x does not change around index {index}")]
    DegenerateAxis { index: usize },

    #[error("smoothing factor must be finite and non-negative, got {0}")]
    InvalidSmoothness(f64),

    #[error("image of {rows}x{cols} needs {expected} pixels, got {found}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
}

impl TransformError {
    pub fn is_insufficient_samples(&self) -> bool {
        matches!(self, TransformError::InsufficientSamples { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
