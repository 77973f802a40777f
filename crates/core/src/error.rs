//! # Error Types
//!
//! Kernel failures are raised before a single element of the destination
//! is written. A buffer that rejected a call is left exactly as it was.

use std::fmt;

use thiserror::Error;

use crate::shape::Shape;

/// The shapes involved in a rejected kernel call, destination first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shapes(pub Vec<Shape>);

impl fmt::Display for Shapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", joined)
    }
}

/// Errors raised by shapes and buffer kernels.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// The operand shapes don't satisfy the operator's shape relationship.
    #[error("Invalid shapes for operator {operator} @ {shapes}")]
    ShapeMismatch {
        operator: &'static str,
        shapes: Shapes,
    },

    /// A raw dimension list is not a `[height, width]` pair of positive sizes.
    #[error("Invalid shape {dims:?}: expected [height, width] with both > 0")]
    InvalidShape { dims: Vec<usize> },

    /// Pre-populated data doesn't fill the buffer exactly.
    #[error("Buffer length mismatch: expected {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// More values were supplied than the buffer can hold.
    #[error("Too many values: buffer holds {capacity}, got {got}")]
    ValueOverflow { capacity: usize, got: usize },

    /// Uniform bounds rejected by `check_uniform_range`.
    #[error("Invalid uniform range [{min}, {max})")]
    InvalidRange { min: f64, max: f64 },

    /// A column index lies outside the matrix.
    #[error("Column {column} out of range for operator {operator} (width {width})")]
    ColumnOutOfRange {
        operator: &'static str,
        column: usize,
        width: usize,
    },
}

impl CoreError {
    /// Build a shape mismatch from the shapes of every buffer involved.
    pub fn shape_mismatch(operator: &'static str, shapes: &[Shape]) -> Self {
        CoreError::ShapeMismatch {
            operator,
            shapes: Shapes(shapes.to_vec()),
        }
    }
}
