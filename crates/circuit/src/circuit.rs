//! # Circuits - Composable Programs over Wires
//!
//! A [`Circuit`] is a morphism in a symmetric monoidal category whose objects
//! are wires ([`Ob`]). Circuits are plain values: building one never touches
//! a runtime. Only [`Circuit::apply`] does, by tracing into a [`Runtime`].
//!
//! ## Structure
//!
//! | Circuit | Categorical reading | Apply |
//! |---------|---------------------|-------|
//! | `Id` | identity `1_A` | returns its input |
//! | `Braid` | symmetry `σ: A ⊗ B → B ⊗ A` | swaps a pair |
//! | `Operator` | generator | allocates and schedules a kernel |
//! | `Sequence(f, g)` | composition `f ; g` | threads the output of `f` into `g` |
//! | `Parallel(f, g)` | tensor `f ⊗ g` | applies each half of a pair |
//!
//! ```text
//!           ┌─────┐      ┌──────┐ ─┐  ┌─────┐
//!   unit ───│ one │──────│ copy │  ├──│ add │─── 2
//!           └─────┘      └──────┘ ─┘  └─────┘
//!
//!   one(1x1) ; copy ; add
//! ```
//!
//! Composing with `Id` is simplified structurally: `c.seq(Id)` and
//! `Id.seq(c)` are `c` itself, never a wrapper node.

use std::fmt;
use std::str::FromStr;

use monoidal_core::{check_uniform_range, Shape};
use serde::{Deserialize, Serialize};

use crate::error::CircuitError;
use crate::ob::Ob;
use crate::runtime::Runtime;

// ============================================================================
// Opcodes and Parameters
// ============================================================================

/// The generators of the circuit algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Opcode {
    /// `A → A ⊗ I`: introduce a trailing unit wire.
    Ui,
    /// `A ⊗ I → A`: eliminate a trailing unit wire.
    Ue,
    Zero,
    One,
    Constant,
    RandomUniform,
    /// Transpose.
    Dual,
    Relu,
    Cos,
    Sin,
    Cis,
    Sic,
    Sumk,
    Add,
    /// Matrix product.
    Mul,
    /// Hadamard product.
    Point,
    /// Discard a matrix wire.
    Drop,
    /// Duplicate a matrix wire. Both outputs name the same arena slot.
    Copy,
}

impl Opcode {
    pub const ALL: [Opcode; 18] = [
        Opcode::Ui,
        Opcode::Ue,
        Opcode::Zero,
        Opcode::One,
        Opcode::Constant,
        Opcode::RandomUniform,
        Opcode::Dual,
        Opcode::Relu,
        Opcode::Cos,
        Opcode::Sin,
        Opcode::Cis,
        Opcode::Sic,
        Opcode::Sumk,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Point,
        Opcode::Drop,
        Opcode::Copy,
    ];

    /// Canonical name, as used in serialized circuits and tapes.
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Ui => "ui",
            Opcode::Ue => "ue",
            Opcode::Zero => "zero",
            Opcode::One => "one",
            Opcode::Constant => "constant",
            Opcode::RandomUniform => "randomUniform",
            Opcode::Dual => "dual",
            Opcode::Relu => "relu",
            Opcode::Cos => "cos",
            Opcode::Sin => "sin",
            Opcode::Cis => "cis",
            Opcode::Sic => "sic",
            Opcode::Sumk => "sumk",
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::Point => "point",
            Opcode::Drop => "drop",
            Opcode::Copy => "copy",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("Unknown opcode: {}", s))
    }
}

/// A parameter carried by an operator leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    Number(f64),
    Values(Vec<f64>),
    Shape(Shape),
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Number(x) => write!(f, "{}", x),
            Parameter::Values(values) => write!(f, "{:?}", values),
            Parameter::Shape(shape) => write!(f, "{}", shape),
        }
    }
}

// ============================================================================
// Operator Leaves
// ============================================================================

/// A leaf computation: an opcode plus its parameters.
///
/// The smart constructors on [`Circuit`] always produce well-formed
/// parameters. Operators built by hand or deserialized are checked when
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub opcode: Opcode,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Operator {
    pub fn new(opcode: Opcode, parameters: Vec<Parameter>) -> Self {
        Self { opcode, parameters }
    }

    fn parameter_error(&self) -> CircuitError {
        CircuitError::Parameter {
            circuit: self.to_string(),
        }
    }

    fn no_parameters(&self) -> Result<(), CircuitError> {
        if self.parameters.is_empty() {
            Ok(())
        } else {
            Err(self.parameter_error())
        }
    }

    fn shape_parameter(&self) -> Result<Shape, CircuitError> {
        match self.parameters.as_slice() {
            [Parameter::Shape(shape)] if shape.is_valid() => Ok(*shape),
            _ => Err(self.parameter_error()),
        }
    }

    fn column_parameter(&self, width: usize) -> Result<usize, CircuitError> {
        match self.parameters.as_slice() {
            [Parameter::Number(k)]
                if *k >= 0.0 && k.fract() == 0.0 && (*k as usize) < width =>
            {
                Ok(*k as usize)
            }
            _ => Err(self.parameter_error()),
        }
    }

    /// Trace this operator: check the incoming wire and parameters, then
    /// allocate and schedule through the runtime.
    pub fn apply(&self, src: Ob, rt: &mut Runtime) -> Result<Ob, CircuitError> {
        match self.opcode {
            Opcode::Ui => {
                self.no_parameters()?;
                Ok(Ob::pair(src, Ob::Unit))
            }
            Opcode::Ue => {
                self.no_parameters()?;
                let (fst, snd) = src.into_pair()?;
                snd.assert_unit()?;
                Ok(fst)
            }
            Opcode::Zero => {
                src.assert_unit()?;
                let shape = self.shape_parameter()?;
                Ok(rt.zero(shape)?.into())
            }
            Opcode::One => {
                src.assert_unit()?;
                let shape = self.shape_parameter()?;
                Ok(rt.one(shape)?.into())
            }
            Opcode::Constant => {
                src.assert_unit()?;
                match self.parameters.as_slice() {
                    [Parameter::Shape(shape), Parameter::Values(values)]
                        if shape.is_valid() && values.len() <= shape.capacity() =>
                    {
                        Ok(rt.constant(*shape, values.clone())?.into())
                    }
                    _ => Err(self.parameter_error()),
                }
            }
            Opcode::RandomUniform => {
                src.assert_unit()?;
                match self.parameters.as_slice() {
                    [Parameter::Shape(shape), Parameter::Number(min), Parameter::Number(max)]
                        if shape.is_valid() && check_uniform_range(*min, *max).is_ok() =>
                    {
                        Ok(rt.random_uniform(*shape, *min, *max)?.into())
                    }
                    _ => Err(self.parameter_error()),
                }
            }
            Opcode::Dual => {
                self.no_parameters()?;
                Ok(rt.dual(&src.as_matrix()?)?.into())
            }
            Opcode::Relu => {
                self.no_parameters()?;
                Ok(rt.relu(&src.as_matrix()?)?.into())
            }
            Opcode::Cos => {
                self.no_parameters()?;
                Ok(rt.cos(&src.as_matrix()?)?.into())
            }
            Opcode::Sin => {
                self.no_parameters()?;
                Ok(rt.sin(&src.as_matrix()?)?.into())
            }
            Opcode::Cis => {
                self.no_parameters()?;
                Ok(rt.cis(&src.as_matrix()?)?.into())
            }
            Opcode::Sic => {
                self.no_parameters()?;
                Ok(rt.sic(&src.as_matrix()?)?.into())
            }
            Opcode::Sumk => {
                let handle = src.as_matrix()?;
                let k = self.column_parameter(handle.width())?;
                Ok(rt.sumk(&handle, k)?.into())
            }
            Opcode::Add => {
                self.no_parameters()?;
                let (fst, snd) = src.as_matrix_pair()?;
                Ok(rt.add(&fst, &snd)?.into())
            }
            Opcode::Mul => {
                self.no_parameters()?;
                let (fst, snd) = src.as_matrix_pair()?;
                Ok(rt.mul(&fst, &snd)?.into())
            }
            Opcode::Point => {
                self.no_parameters()?;
                let (fst, snd) = src.as_matrix_pair()?;
                Ok(rt.point(&fst, &snd)?.into())
            }
            Opcode::Drop => {
                self.no_parameters()?;
                src.assert_matrix()?;
                Ok(Ob::Unit)
            }
            Opcode::Copy => {
                self.no_parameters()?;
                let handle = src.as_matrix()?;
                Ok(Ob::pair(handle.into(), handle.into()))
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.parameters.is_empty() {
            let params = self
                .parameters
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "({})", params)?;
        }
        Ok(())
    }
}

// ============================================================================
// Circuits
// ============================================================================

/// A composable, side-effect-free description of a computation over wires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Circuit {
    Id,
    Braid,
    Operator(Operator),
    Sequence(Box<Circuit>, Box<Circuit>),
    Parallel(Box<Circuit>, Box<Circuit>),
}

impl Circuit {
    /// Sequential composition: `self` then `rhs`.
    ///
    /// Identities vanish, and sequences are kept right-nested, so
    /// `(a ; b) ; c` is built as `a ; (b ; c)`.
    pub fn seq(self, rhs: Circuit) -> Circuit {
        match (self, rhs) {
            (Circuit::Id, rhs) => rhs,
            (lhs, Circuit::Id) => lhs,
            (Circuit::Sequence(fst, snd), rhs) => fst.seq(snd.seq(rhs)),
            (lhs, rhs) => Circuit::Sequence(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Parallel composition: `self ⊗ rhs`.
    pub fn par(self, rhs: Circuit) -> Circuit {
        Circuit::Parallel(Box::new(self), Box::new(rhs))
    }

    /// Trace this circuit against `rt`, consuming the input wire and
    /// returning the output wire.
    pub fn apply(&self, src: Ob, rt: &mut Runtime) -> Result<Ob, CircuitError> {
        match self {
            Circuit::Id => Ok(src),
            Circuit::Braid => {
                let (fst, snd) = src.into_pair()?;
                Ok(Ob::pair(snd, fst))
            }
            Circuit::Operator(op) => op.apply(src, rt),
            Circuit::Sequence(fst, snd) => {
                let inner = fst.apply(src, rt)?;
                snd.apply(inner, rt)
            }
            Circuit::Parallel(fst, snd) => {
                let (a, b) = src.into_pair()?;
                let a = fst.apply(a, rt)?;
                let b = snd.apply(b, rt)?;
                Ok(Ob::pair(a, b))
            }
        }
    }

    /// Number of operator leaves.
    pub fn size(&self) -> usize {
        match self {
            Circuit::Id | Circuit::Braid => 0,
            Circuit::Operator(_) => 1,
            Circuit::Sequence(fst, snd) | Circuit::Parallel(fst, snd) => fst.size() + snd.size(),
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn id() -> Self {
        Circuit::Id
    }

    pub fn braid() -> Self {
        Circuit::Braid
    }

    /// An operator leaf with explicit parameters.
    pub fn operator(opcode: Opcode, parameters: Vec<Parameter>) -> Self {
        Circuit::Operator(Operator::new(opcode, parameters))
    }

    fn leaf(opcode: Opcode) -> Self {
        Self::operator(opcode, Vec::new())
    }

    pub fn zero(shape: Shape) -> Self {
        Self::operator(Opcode::Zero, vec![Parameter::Shape(shape)])
    }

    pub fn one(shape: Shape) -> Self {
        Self::operator(Opcode::One, vec![Parameter::Shape(shape)])
    }

    pub fn constant(shape: Shape, values: Vec<f64>) -> Self {
        Self::operator(
            Opcode::Constant,
            vec![Parameter::Shape(shape), Parameter::Values(values)],
        )
    }

    pub fn random_uniform(shape: Shape, min: f64, max: f64) -> Self {
        Self::operator(
            Opcode::RandomUniform,
            vec![
                Parameter::Shape(shape),
                Parameter::Number(min),
                Parameter::Number(max),
            ],
        )
    }

    pub fn sumk(k: usize) -> Self {
        Self::operator(Opcode::Sumk, vec![Parameter::Number(k as f64)])
    }

    pub fn ui() -> Self {
        Self::leaf(Opcode::Ui)
    }

    pub fn ue() -> Self {
        Self::leaf(Opcode::Ue)
    }

    pub fn dual() -> Self {
        Self::leaf(Opcode::Dual)
    }

    pub fn relu() -> Self {
        Self::leaf(Opcode::Relu)
    }

    pub fn cos() -> Self {
        Self::leaf(Opcode::Cos)
    }

    pub fn sin() -> Self {
        Self::leaf(Opcode::Sin)
    }

    pub fn cis() -> Self {
        Self::leaf(Opcode::Cis)
    }

    pub fn sic() -> Self {
        Self::leaf(Opcode::Sic)
    }

    pub fn add() -> Self {
        Self::leaf(Opcode::Add)
    }

    pub fn mul() -> Self {
        Self::leaf(Opcode::Mul)
    }

    pub fn point() -> Self {
        Self::leaf(Opcode::Point)
    }

    pub fn drop() -> Self {
        Self::leaf(Opcode::Drop)
    }

    pub fn copy() -> Self {
        Self::leaf(Opcode::Copy)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Circuit::Id => write!(f, "id"),
            Circuit::Braid => write!(f, "braid"),
            Circuit::Operator(op) => write!(f, "{}", op),
            Circuit::Sequence(fst, snd) => write!(f, "({} ; {})", fst, snd),
            Circuit::Parallel(fst, snd) => write!(f, "({} ⊗ {})", fst, snd),
        }
    }
}
