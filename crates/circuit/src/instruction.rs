//! # Instructions - The Tape
//!
//! Tracing a circuit records one [`Instruction`] per scheduled kernel. An
//! instruction is plain data: an opcode plus the arena slots it reads and
//! writes. It holds no buffers and no closures, so a tape can be printed,
//! compared and serialized.
//!
//! ```text
//!    slot 0 ── constant ─┐
//!                        ├── add ── slot 2
//!    slot 1 ── constant ─┘
//!
//!    tape: [constant→0, constant→1, add(0, 1)→2]
//! ```

use monoidal_core::{Buffer, CoreError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::circuit::Opcode;

/// Index of a buffer in a runtime arena.
pub type Slot = usize;

/// One recorded kernel invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "opcode", rename_all = "camelCase")]
pub enum Instruction {
    Zero { dst: Slot },
    One { dst: Slot },
    Constant { dst: Slot, values: Vec<f64> },
    RandomUniform { dst: Slot, min: f64, max: f64 },
    Dual { dst: Slot, src: Slot },
    Relu { dst: Slot, src: Slot },
    Cos { dst: Slot, src: Slot },
    Sin { dst: Slot, src: Slot },
    Cis { dst: Slot, src: Slot },
    Sic { dst: Slot, src: Slot },
    Sumk { dst: Slot, src: Slot, k: usize },
    Add { dst: Slot, fst: Slot, snd: Slot },
    Mul { dst: Slot, fst: Slot, snd: Slot },
    Point { dst: Slot, fst: Slot, snd: Slot },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Zero { .. } => Opcode::Zero,
            Instruction::One { .. } => Opcode::One,
            Instruction::Constant { .. } => Opcode::Constant,
            Instruction::RandomUniform { .. } => Opcode::RandomUniform,
            Instruction::Dual { .. } => Opcode::Dual,
            Instruction::Relu { .. } => Opcode::Relu,
            Instruction::Cos { .. } => Opcode::Cos,
            Instruction::Sin { .. } => Opcode::Sin,
            Instruction::Cis { .. } => Opcode::Cis,
            Instruction::Sic { .. } => Opcode::Sic,
            Instruction::Sumk { .. } => Opcode::Sumk,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Point { .. } => Opcode::Point,
        }
    }

    /// The slot this instruction writes.
    pub fn dst(&self) -> Slot {
        match *self {
            Instruction::Zero { dst }
            | Instruction::One { dst }
            | Instruction::Constant { dst, .. }
            | Instruction::RandomUniform { dst, .. }
            | Instruction::Dual { dst, .. }
            | Instruction::Relu { dst, .. }
            | Instruction::Cos { dst, .. }
            | Instruction::Sin { dst, .. }
            | Instruction::Cis { dst, .. }
            | Instruction::Sic { dst, .. }
            | Instruction::Sumk { dst, .. }
            | Instruction::Add { dst, .. }
            | Instruction::Mul { dst, .. }
            | Instruction::Point { dst, .. } => dst,
        }
    }

    /// The slots this instruction reads.
    pub fn operands(&self) -> Vec<Slot> {
        match *self {
            Instruction::Zero { .. }
            | Instruction::One { .. }
            | Instruction::Constant { .. }
            | Instruction::RandomUniform { .. } => vec![],
            Instruction::Dual { src, .. }
            | Instruction::Relu { src, .. }
            | Instruction::Cos { src, .. }
            | Instruction::Sin { src, .. }
            | Instruction::Cis { src, .. }
            | Instruction::Sic { src, .. }
            | Instruction::Sumk { src, .. } => vec![src],
            Instruction::Add { fst, snd, .. }
            | Instruction::Mul { fst, snd, .. }
            | Instruction::Point { fst, snd, .. } => vec![fst, snd],
        }
    }

    /// Whether running this instruction twice differs from running it once.
    ///
    /// `mul` adds into its destination without clearing it.
    pub fn accumulates(&self) -> bool {
        matches!(self, Instruction::Mul { .. })
    }

    /// Run the kernel against the arena.
    ///
    /// Every operand slot is older than the destination, so the arena splits
    /// at `dst` into read-only operands and the buffer being written. The
    /// runtime validates slots before an instruction reaches the tape.
    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        arena: &mut [Buffer],
        rng: &mut R,
    ) -> Result<(), CoreError> {
        let (operands, rest) = arena.split_at_mut(self.dst());
        self.kernel(&mut rest[0], operands, rng)
    }

    fn kernel<R: Rng + ?Sized>(
        &self,
        out: &mut Buffer,
        arena: &[Buffer],
        rng: &mut R,
    ) -> Result<(), CoreError> {
        match self {
            Instruction::Zero { .. } => {
                out.zero();
                Ok(())
            }
            Instruction::One { .. } => {
                out.one();
                Ok(())
            }
            Instruction::Constant { values, .. } => out.set(values),
            Instruction::RandomUniform { min, max, .. } => out.random_uniform(*min, *max, rng),
            Instruction::Dual { src, .. } => out.dual(&arena[*src]),
            Instruction::Relu { src, .. } => out.relu(&arena[*src]),
            Instruction::Cos { src, .. } => out.cos(&arena[*src]),
            Instruction::Sin { src, .. } => out.sin(&arena[*src]),
            Instruction::Cis { src, .. } => out.cis(&arena[*src]),
            Instruction::Sic { src, .. } => out.sic(&arena[*src]),
            Instruction::Sumk { src, k, .. } => out.sumk(&arena[*src], *k),
            Instruction::Add { fst, snd, .. } => out.add(&arena[*fst], &arena[*snd]),
            Instruction::Mul { fst, snd, .. } => out.mul(&arena[*fst], &arena[*snd]),
            Instruction::Point { fst, snd, .. } => out.point(&arena[*fst], &arena[*snd]),
        }
    }
}
