//! # Shapes - Types as Objects
//!
//! Every wire carrying a matrix is typed by its shape. Operators are only
//! defined between shapes that fit together, so the shape rules live here,
//! next to the type, and are shared by the kernels (which check at execution)
//! and the circuit runtime (which checks while tracing).
//!
//! ## Design Choices
//!
//! Shapes are always two-dimensional: `(height, width)`. Row vectors and
//! column vectors are just `1 x n` and `n x 1` matrices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The dimensions of a dense row-major matrix.
///
/// Serialized as the raw `[height, width]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "[usize; 2]")]
pub struct Shape {
    height: usize,
    width: usize,
}

impl Shape {
    /// Create a shape with the given number of rows and columns.
    ///
    /// Both must be positive. Nothing checks that here; buffers and runtimes
    /// call [`Shape::check`] before allocating, and [`Shape::try_new`] is the
    /// checked form for dimensions from outside.
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn try_new(height: usize, width: usize) -> Result<Self, CoreError> {
        Shape::new(height, width).check()
    }

    /// Both dimensions are positive.
    pub const fn is_valid(&self) -> bool {
        self.height > 0 && self.width > 0
    }

    /// `Ok(self)` when both dimensions are positive, `InvalidShape` otherwise.
    pub fn check(self) -> Result<Self, CoreError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(CoreError::InvalidShape {
                dims: vec![self.height, self.width],
            })
        }
    }

    /// A `1 x n` row vector.
    pub const fn row(width: usize) -> Self {
        Self::new(1, width)
    }

    /// A `n x n` square matrix.
    pub const fn square(n: usize) -> Self {
        Self::new(n, n)
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Total number of elements.
    pub const fn capacity(&self) -> usize {
        self.height * self.width
    }

    /// The shape with height and width exchanged.
    pub const fn transposed(&self) -> Self {
        Self::new(self.width, self.height)
    }

    pub fn is_square(&self) -> bool {
        self.height == self.width
    }

    /// Flat row-major index of `(row, col)`.
    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.height && col < self.width {
            Some(row * self.width + col)
        } else {
            None
        }
    }
}

// ============================================================================
// Shape Rules
// ============================================================================

/// Result shape of `dual` (transpose).
pub fn dual_shape(src: Shape) -> Shape {
    src.transposed()
}

/// Result shape of an elementwise binary operator (`add`, `point`).
///
/// Both operands must have exactly the same shape.
pub fn elementwise_shape(
    operator: &'static str,
    fst: Shape,
    snd: Shape,
) -> Result<Shape, CoreError> {
    if fst != snd {
        return Err(CoreError::shape_mismatch(operator, &[fst, snd]));
    }
    Ok(fst)
}

/// Result shape of the matrix product `fst · snd`.
///
/// Requires `fst.width == snd.height`; the product is `fst.height x snd.width`.
pub fn mul_shape(fst: Shape, snd: Shape) -> Result<Shape, CoreError> {
    if fst.width != snd.height {
        return Err(CoreError::shape_mismatch("mul", &[fst, snd]));
    }
    Ok(Shape::new(fst.height, snd.width))
}

// ============================================================================
// Conversions
// ============================================================================

impl TryFrom<Vec<usize>> for Shape {
    type Error = CoreError;

    fn try_from(dims: Vec<usize>) -> Result<Self, Self::Error> {
        Shape::try_from(dims.as_slice())
    }
}

impl TryFrom<&[usize]> for Shape {
    type Error = CoreError;

    fn try_from(dims: &[usize]) -> Result<Self, Self::Error> {
        match *dims {
            [height, width] => Shape::try_new(height, width),
            _ => Err(CoreError::InvalidShape {
                dims: dims.to_vec(),
            }),
        }
    }
}

impl TryFrom<[usize; 2]> for Shape {
    type Error = CoreError;

    fn try_from(dims: [usize; 2]) -> Result<Self, Self::Error> {
        Shape::try_from(&dims[..])
    }
}

impl From<Shape> for [usize; 2] {
    fn from(shape: Shape) -> Self {
        [shape.height, shape.width]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}
