//! # Core - Matrices as Wires
//!
//! This crate provides the numeric layer beneath the circuit algebra:
//!
//! - **Shapes**: `(height, width)` descriptors and the shape rules of every operator
//! - **Buffers**: dense row-major storage with shape-checked, in-place kernels
//! - **Errors**: kernel failures, raised before the destination is touched
//!
//! ## Design Philosophy
//!
//! A buffer kernel is always invoked on its destination. Operands are borrowed
//! read-only, so a kernel can never alias its own output, and a failed shape
//! check leaves the destination exactly as it was.

pub mod buffer;
pub mod error;
pub mod shape;

// Re-export key types at crate root for convenience
pub use buffer::{check_uniform_range, Buffer, EPSILON};
pub use error::CoreError;
pub use shape::Shape;
