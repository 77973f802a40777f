//! # Buffers - Dense Row-Major Storage
//!
//! A [`Buffer`] owns `shape.capacity()` values laid out row-major: element
//! `(row, col)` lives at `row * width + col`.
//!
//! Every kernel is called on the *destination* and receives its operands
//! read-only. Kernels validate the shape relationship first and only then
//! overwrite the destination, so a rejected call never leaves partial writes.
//!
//! | Kernel | Shape rule | Effect |
//! |--------|------------|--------|
//! | `dual` | dst = srcᵀ shape | transpose |
//! | `relu`, `cos`, `sin`, `cis`, `sic` | dst = src | elementwise |
//! | `add`, `point` | dst = fst = snd | sum / Hadamard product |
//! | `mul` | dst = fst.h x snd.w, fst.w = snd.h | accumulating matrix product |
//! | `sumk` | dst = src, k < width | per-row sum into column k |

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::shape::Shape;

/// Absolute per-element tolerance used by [`Buffer::equals`].
pub const EPSILON: f64 = 1e-4;

/// A dense matrix of `f64` values tagged with its [`Shape`].
///
/// Serialized as `{ "shape": [h, w], "buffer": [...] }`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBuffer", into = "RawBuffer")]
pub struct Buffer {
    shape: Shape,
    data: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawBuffer {
    shape: Shape,
    buffer: Vec<f64>,
}

impl TryFrom<RawBuffer> for Buffer {
    type Error = CoreError;

    fn try_from(raw: RawBuffer) -> Result<Self, Self::Error> {
        Buffer::from_vec(raw.shape, raw.buffer)
    }
}

impl From<Buffer> for RawBuffer {
    fn from(buffer: Buffer) -> Self {
        RawBuffer {
            shape: buffer.shape,
            buffer: buffer.data,
        }
    }
}

impl Buffer {
    /// Create a zero-filled buffer.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.capacity()],
        }
    }

    /// Create a buffer from pre-populated row-major data.
    ///
    /// The shape must be valid and the number of values must equal its
    /// capacity.
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self, CoreError> {
        let shape = shape.check()?;
        if data.len() != shape.capacity() {
            return Err(CoreError::LengthMismatch {
                expected: shape.capacity(),
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn height(&self) -> usize {
        self.shape.height()
    }

    pub fn width(&self) -> usize {
        self.shape.width()
    }

    pub fn capacity(&self) -> usize {
        self.shape.capacity()
    }

    /// The raw row-major values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.shape.index(row, col).map(|i| self.data[i])
    }

    fn ensure(
        &self,
        ok: bool,
        operator: &'static str,
        operands: &[&Buffer],
    ) -> Result<(), CoreError> {
        if ok {
            return Ok(());
        }
        let mut shapes = Vec::with_capacity(operands.len() + 1);
        shapes.push(self.shape);
        shapes.extend(operands.iter().map(|b| b.shape));
        Err(CoreError::shape_mismatch(operator, &shapes))
    }

    fn map_from(
        &mut self,
        operator: &'static str,
        src: &Buffer,
        f: impl Fn(usize, f64) -> f64,
    ) -> Result<(), CoreError> {
        self.ensure(self.shape == src.shape, operator, &[src])?;
        for (i, (dst, &x)) in self.data.iter_mut().zip(src.data.iter()).enumerate() {
            *dst = f(i, x);
        }
        Ok(())
    }

    fn zip_from(
        &mut self,
        operator: &'static str,
        fst: &Buffer,
        snd: &Buffer,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<(), CoreError> {
        self.ensure(
            self.shape == fst.shape && self.shape == snd.shape,
            operator,
            &[fst, snd],
        )?;
        let operands = fst.data.iter().zip(snd.data.iter());
        for (dst, (&a, &b)) in self.data.iter_mut().zip(operands) {
            *dst = f(a, b);
        }
        Ok(())
    }

    // ========================================================================
    // Fills
    // ========================================================================

    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn one(&mut self) {
        self.data.fill(1.0);
    }

    /// Copy `values` into the leading elements.
    ///
    /// A shorter sequence overwrites only the prefix and leaves the remaining
    /// elements untouched. A longer sequence is rejected without writing.
    pub fn set(&mut self, values: &[f64]) -> Result<(), CoreError> {
        if values.len() > self.capacity() {
            return Err(CoreError::ValueOverflow {
                capacity: self.capacity(),
                got: values.len(),
            });
        }
        self.data[..values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Fill with independent uniform draws from `[min, max)`.
    ///
    /// `min == max` fills with `min`. Bounds rejected by
    /// [`check_uniform_range`] leave the buffer untouched.
    pub fn random_uniform<R: Rng + ?Sized>(
        &mut self,
        min: f64,
        max: f64,
        rng: &mut R,
    ) -> Result<(), CoreError> {
        check_uniform_range(min, max)?;
        if min == max {
            self.data.fill(min);
            return Ok(());
        }
        let dist = Uniform::new(min, max);
        for x in self.data.iter_mut() {
            *x = dist.sample(rng);
        }
        Ok(())
    }

    // ========================================================================
    // Unary Kernels
    // ========================================================================

    /// Transpose: `dst[r, c] = src[c, r]`.
    pub fn dual(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.ensure(self.shape == src.shape.transposed(), "dual", &[src])?;
        let (height, width) = (self.height(), self.width());
        for row in 0..height {
            for col in 0..width {
                self.data[row * width + col] = src.data[col * height + row];
            }
        }
        Ok(())
    }

    pub fn relu(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.map_from("relu", src, |_, x| if x > 0.0 { x } else { 0.0 })
    }

    pub fn cos(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.map_from("cos", src, |_, x| x.cos())
    }

    pub fn sin(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.map_from("sin", src, |_, x| x.sin())
    }

    /// Alternate by flat index: cosine at even positions, sine at odd ones.
    pub fn cis(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.map_from("cis", src, |i, x| if i % 2 == 0 { x.cos() } else { x.sin() })
    }

    /// The mirror of [`Buffer::cis`]: sine at even positions, cosine at odd ones.
    pub fn sic(&mut self, src: &Buffer) -> Result<(), CoreError> {
        self.map_from("sic", src, |i, x| if i % 2 == 0 { x.sin() } else { x.cos() })
    }

    /// Per-row reduction.
    ///
    /// Each row of `src` is summed; the sum is written to column `k` of the
    /// same row in `self` and every other column of that row is zeroed.
    pub fn sumk(&mut self, src: &Buffer, k: usize) -> Result<(), CoreError> {
        self.ensure(self.shape == src.shape, "sumk", &[src])?;
        let width = self.width();
        if k >= width {
            return Err(CoreError::ColumnOutOfRange {
                operator: "sumk",
                column: k,
                width,
            });
        }
        for (dst_row, src_row) in self.data.chunks_mut(width).zip(src.data.chunks(width)) {
            let sum: f64 = src_row.iter().sum();
            dst_row.fill(0.0);
            dst_row[k] = sum;
        }
        Ok(())
    }

    // ========================================================================
    // Binary Kernels
    // ========================================================================

    pub fn add(&mut self, fst: &Buffer, snd: &Buffer) -> Result<(), CoreError> {
        self.zip_from("add", fst, snd, |a, b| a + b)
    }

    /// Hadamard (elementwise) product.
    pub fn point(&mut self, fst: &Buffer, snd: &Buffer) -> Result<(), CoreError> {
        self.zip_from("point", fst, snd, |a, b| a * b)
    }

    /// Matrix product `fst · snd`, **accumulated** into `self`.
    ///
    /// The destination is not cleared first; callers that want a plain
    /// product must start from a zeroed buffer.
    pub fn mul(&mut self, fst: &Buffer, snd: &Buffer) -> Result<(), CoreError> {
        self.ensure(
            self.height() == fst.height()
                && self.width() == snd.width()
                && fst.width() == snd.height(),
            "mul",
            &[fst, snd],
        )?;
        let (inner, width) = (fst.width(), snd.width());
        for row in 0..fst.height() {
            for dot in 0..inner {
                let lhs = fst.data[row * inner + dot];
                for col in 0..width {
                    self.data[row * width + col] += lhs * snd.data[dot * width + col];
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Same shape and every element within [`EPSILON`] of `rhs`.
    pub fn equals(&self, rhs: &Buffer) -> bool {
        self.shape == rhs.shape
            && self
                .data
                .iter()
                .zip(rhs.data.iter())
                .all(|(a, b)| (a - b).abs() <= EPSILON)
    }
}

/// Accept bounds for a uniform fill: both finite, `min <= max`, and a span
/// that doesn't overflow.
pub fn check_uniform_range(min: f64, max: f64) -> Result<(), CoreError> {
    if min.is_finite() && max.is_finite() && min <= max && (max - min).is_finite() {
        Ok(())
    } else {
        Err(CoreError::InvalidRange { min, max })
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({}, {:?})", self.shape, self.data)
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.shape, self.data)
    }
}
