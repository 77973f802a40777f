//! # Wires - The Objects of the Circuit Category
//!
//! An [`Ob`] is the value flowing along a circuit's wires:
//!
//! - `Unit`: the empty wire, the monoidal unit `I`
//! - `Matrix`: a handle to a buffer living in a [`crate::Runtime`] arena
//! - `Pair`: two wires side by side, `A ⊗ B`
//!
//! A matrix wire never owns data. It names an arena slot, and the runtime
//! that allocated it is the only one that will resolve it.

use std::fmt;

use monoidal_core::Shape;

use crate::error::CircuitError;
use crate::runtime::RuntimeId;

/// A non-owning reference to a buffer in a runtime arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixHandle {
    shape: Shape,
    uid: usize,
    runtime: RuntimeId,
}

impl MatrixHandle {
    pub(crate) fn new(shape: Shape, uid: usize, runtime: RuntimeId) -> Self {
        Self {
            shape,
            uid,
            runtime,
        }
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

    /// Arena index of the referenced buffer.
    pub fn uid(&self) -> usize {
        self.uid
    }

    /// The runtime that allocated this handle.
    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }
}

impl fmt::Display for MatrixHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matrix[{}]#{}", self.shape, self.uid)
    }
}

/// A wire value: unit, a matrix handle, or a pair of wires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ob {
    Unit,
    Matrix(MatrixHandle),
    Pair(Box<Ob>, Box<Ob>),
}

impl Ob {
    pub fn unit() -> Self {
        Ob::Unit
    }

    pub fn pair(fst: Ob, snd: Ob) -> Self {
        Ob::Pair(Box::new(fst), Box::new(snd))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Ob::Unit)
    }

    /// First component of a pair.
    pub fn fst(&self) -> Result<&Ob, CircuitError> {
        match self {
            Ob::Pair(fst, _) => Ok(fst),
            other => Err(other.wire_error("a pair")),
        }
    }

    /// Second component of a pair.
    pub fn snd(&self) -> Result<&Ob, CircuitError> {
        match self {
            Ob::Pair(_, snd) => Ok(snd),
            other => Err(other.wire_error("a pair")),
        }
    }

    /// Split a pair into its components by value.
    pub fn into_pair(self) -> Result<(Ob, Ob), CircuitError> {
        match self {
            Ob::Pair(fst, snd) => Ok((*fst, *snd)),
            other => Err(other.wire_error("a pair")),
        }
    }

    pub fn as_matrix(&self) -> Result<MatrixHandle, CircuitError> {
        match self {
            Ob::Matrix(handle) => Ok(*handle),
            other => Err(other.wire_error("a matrix")),
        }
    }

    /// Both components of a pair of matrices.
    pub fn as_matrix_pair(&self) -> Result<(MatrixHandle, MatrixHandle), CircuitError> {
        Ok((self.fst()?.as_matrix()?, self.snd()?.as_matrix()?))
    }

    pub fn assert_unit(&self) -> Result<(), CircuitError> {
        match self {
            Ob::Unit => Ok(()),
            other => Err(other.wire_error("unit")),
        }
    }

    pub fn assert_matrix(&self) -> Result<(), CircuitError> {
        self.as_matrix().map(|_| ())
    }

    fn wire_error(&self, expected: &'static str) -> CircuitError {
        CircuitError::WireType {
            expected,
            found: self.to_string(),
        }
    }
}

impl From<MatrixHandle> for Ob {
    fn from(handle: MatrixHandle) -> Self {
        Ob::Matrix(handle)
    }
}

impl fmt::Display for Ob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ob::Unit => write!(f, "unit"),
            Ob::Matrix(handle) => write!(f, "{}", handle),
            Ob::Pair(fst, snd) => write!(f, "({} ⊗ {})", fst, snd),
        }
    }
}
