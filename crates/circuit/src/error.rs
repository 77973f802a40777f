//! Error types for tracing and executing circuits.

use monoidal_core::CoreError;
use thiserror::Error;

use crate::ob::MatrixHandle;
use crate::runtime::RuntimeId;

/// Errors raised while applying a circuit or executing a tape.
///
/// None of these are retried internally; they surface to the caller of
/// [`crate::Circuit::apply`] or [`crate::Runtime::execute`] unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CircuitError {
    /// A shape rule was violated, either while tracing or inside a kernel.
    #[error(transparent)]
    Shape(#[from] CoreError),

    /// An operator's parameters don't match what its opcode requires.
    #[error("Invalid parameters for circuit {circuit}")]
    Parameter { circuit: String },

    /// The wire reaching a circuit node has the wrong variant.
    #[error("Expected {expected}, but got {found}")]
    WireType {
        expected: &'static str,
        found: String,
    },

    /// A scheduled instruction names a slot outside the arena, or reads a
    /// slot that isn't older than its destination.
    #[error("Invalid slot in {instruction} (arena holds {arena_len} buffers)")]
    InvalidSlot {
        instruction: String,
        arena_len: usize,
    },

    /// A handle was presented to a runtime that did not allocate it.
    #[error("Handle {handle} is not bound to runtime {runtime}")]
    UnboundRuntime {
        handle: MatrixHandle,
        runtime: RuntimeId,
    },
}
