//! # Runtime - Arena and Tape
//!
//! A [`Runtime`] separates *tracing* from *execution*:
//!
//! - **Tracing**: applying a circuit (or calling the builder methods below)
//!   allocates destination buffers in the arena and appends instructions to
//!   the tape. Only shapes are computed; no numeric work happens.
//! - **Execution**: [`Runtime::execute`] replays the tape in order.
//!
//! Every instruction's destination is allocated after its operands, and the
//! tape is append-only, so tape order is always a valid topological order.
//! No dependency analysis is needed.
//!
//! ## Example
//!
//! ```rust
//! use monoidal_circuit::Runtime;
//! use monoidal_core::Shape;
//!
//! let mut rt = Runtime::new();
//! let a = rt.constant(Shape::new(2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let b = rt.constant(Shape::new(2, 2), vec![5.0, 6.0, 7.0, 8.0]).unwrap();
//! let c = rt.mul(&a, &b).unwrap();
//!
//! // Nothing has been computed yet.
//! assert_eq!(rt.read(&c).unwrap(), &[0.0, 0.0, 0.0, 0.0]);
//!
//! rt.execute().unwrap();
//! assert_eq!(rt.read(&c).unwrap(), &[19.0, 22.0, 43.0, 50.0]);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use monoidal_core::shape::{dual_shape, elementwise_shape, mul_shape};
use monoidal_core::{check_uniform_range, Buffer, CoreError, Shape};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;
use crate::error::CircuitError;
use crate::instruction::{Instruction, Slot};
use crate::ob::MatrixHandle;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one runtime incarnation.
///
/// Handles remember the id of the runtime that issued them. Clearing a
/// runtime gives it a fresh id, retiring every handle issued before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeId(u64);

impl RuntimeId {
    fn fresh() -> Self {
        RuntimeId(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rt{}", self.0)
    }
}

/// An arena of buffers plus the instruction tape that fills them.
pub struct Runtime {
    id: RuntimeId,
    config: RuntimeConfig,
    arena: Vec<Buffer>,
    tape: Vec<Instruction>,
    rng: StdRng,
    executions: usize,
}

impl Runtime {
    /// Create an empty runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let rng = Self::seed_rng(&config);
        Self {
            id: RuntimeId::fresh(),
            config,
            arena: Vec::new(),
            tape: Vec::new(),
            rng,
            executions: 0,
        }
    }

    fn seed_rng(config: &RuntimeConfig) -> StdRng {
        match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The recorded instructions, in execution order.
    pub fn tape(&self) -> &[Instruction] {
        &self.tape
    }

    /// Number of buffers allocated so far.
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    /// How many times the tape has been executed since the last clear.
    pub fn executions(&self) -> usize {
        self.executions
    }

    // ========================================================================
    // Arena
    // ========================================================================

    /// Append a zero-filled buffer to the arena and return its handle.
    ///
    /// Shapes with a zero dimension are rejected.
    pub fn allocate(&mut self, shape: Shape) -> Result<MatrixHandle, CircuitError> {
        let shape = shape.check()?;
        let uid = self.arena.len();
        self.arena.push(Buffer::new(shape));
        trace!(runtime = %self.id, slot = uid, %shape, "allocated buffer");
        Ok(MatrixHandle::new(shape, uid, self.id))
    }

    fn bind(&self, handle: &MatrixHandle) -> Result<Slot, CircuitError> {
        if handle.runtime() != self.id || handle.uid() >= self.arena.len() {
            return Err(CircuitError::UnboundRuntime {
                handle: *handle,
                runtime: self.id,
            });
        }
        Ok(handle.uid())
    }

    /// Resolve a handle to the buffer it names.
    ///
    /// Fails closed for handles issued by another runtime, or by this one
    /// before it was cleared.
    pub fn load(&self, handle: &MatrixHandle) -> Result<&Buffer, CircuitError> {
        let slot = self.bind(handle)?;
        Ok(&self.arena[slot])
    }

    /// The current values behind a handle.
    pub fn read(&self, handle: &MatrixHandle) -> Result<&[f64], CircuitError> {
        self.load(handle).map(Buffer::as_slice)
    }

    // ========================================================================
    // Tape
    // ========================================================================

    /// Append an instruction to the tape.
    ///
    /// The destination must exist in the arena and every operand must be an
    /// older slot, so tape order stays a topological order.
    pub fn schedule(&mut self, instruction: Instruction) -> Result<(), CircuitError> {
        let dst = instruction.dst();
        let len = self.arena.len();
        if dst >= len || instruction.operands().iter().any(|&s| s >= dst) {
            return Err(CircuitError::InvalidSlot {
                instruction: format!("{:?}", instruction),
                arena_len: len,
            });
        }
        self.record(instruction);
        Ok(())
    }

    fn record(&mut self, instruction: Instruction) {
        trace!(
            runtime = %self.id,
            opcode = %instruction.opcode(),
            dst = instruction.dst(),
            operands = ?instruction.operands(),
            "scheduled instruction"
        );
        self.tape.push(instruction);
    }

    /// Replay the tape against the arena, in order.
    ///
    /// Replaying again without re-tracing is deterministic except for
    /// `randomUniform`, which draws fresh values, and `mul`, which adds into
    /// its destination again.
    pub fn execute(&mut self) -> Result<(), CircuitError> {
        if self.executions > 0 && self.tape.iter().any(Instruction::accumulates) {
            warn!(
                runtime = %self.id,
                executions = self.executions,
                "re-executing a tape with accumulating instructions"
            );
        }
        debug!(
            runtime = %self.id,
            instructions = self.tape.len(),
            buffers = self.arena.len(),
            "executing tape"
        );
        for (pc, instruction) in self.tape.iter().enumerate() {
            if let Err(err) = instruction.run(&mut self.arena, &mut self.rng) {
                debug!(
                    runtime = %self.id,
                    pc,
                    opcode = %instruction.opcode(),
                    %err,
                    "instruction failed"
                );
                return Err(err.into());
            }
        }
        self.executions += 1;
        debug!(runtime = %self.id, executions = self.executions, "tape executed");
        Ok(())
    }

    /// Drop every buffer and instruction.
    ///
    /// The runtime takes a fresh identity, so handles issued before the
    /// clear no longer resolve. A seeded runtime is reseeded.
    pub fn clear(&mut self) {
        debug!(
            runtime = %self.id,
            buffers = self.arena.len(),
            instructions = self.tape.len(),
            "clearing runtime"
        );
        self.id = RuntimeId::fresh();
        self.arena.clear();
        self.tape.clear();
        self.rng = Self::seed_rng(&self.config);
        self.executions = 0;
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Allocate a destination and record the instruction that fills it.
    ///
    /// Operand slots come from `bind`, so they are known to be valid and
    /// strictly older than the destination.
    fn emit(
        &mut self,
        shape: Shape,
        build: impl FnOnce(Slot) -> Instruction,
    ) -> Result<MatrixHandle, CircuitError> {
        let dst = self.allocate(shape)?;
        self.record(build(dst.uid()));
        Ok(dst)
    }

    pub fn zero(&mut self, shape: Shape) -> Result<MatrixHandle, CircuitError> {
        self.emit(shape, |dst| Instruction::Zero { dst })
    }

    pub fn one(&mut self, shape: Shape) -> Result<MatrixHandle, CircuitError> {
        self.emit(shape, |dst| Instruction::One { dst })
    }

    /// A matrix filled from `values` when the tape runs.
    ///
    /// Fewer values than the capacity fill only the leading elements.
    pub fn constant(
        &mut self,
        shape: Shape,
        values: Vec<f64>,
    ) -> Result<MatrixHandle, CircuitError> {
        if values.len() > shape.capacity() {
            return Err(CoreError::ValueOverflow {
                capacity: shape.capacity(),
                got: values.len(),
            }
            .into());
        }
        self.emit(shape, |dst| Instruction::Constant { dst, values })
    }

    /// A matrix of uniform draws from `[min, max)`, redrawn on every execute.
    ///
    /// Bounds must be finite with `min <= max` and a representable span.
    pub fn random_uniform(
        &mut self,
        shape: Shape,
        min: f64,
        max: f64,
    ) -> Result<MatrixHandle, CircuitError> {
        check_uniform_range(min, max)?;
        self.emit(shape, |dst| Instruction::RandomUniform { dst, min, max })
    }

    pub fn dual(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        let src = self.bind(src)?;
        let shape = dual_shape(self.arena[src].shape());
        self.emit(shape, |dst| Instruction::Dual { dst, src })
    }

    fn unary(
        &mut self,
        src: &MatrixHandle,
        build: impl FnOnce(Slot, Slot) -> Instruction,
    ) -> Result<MatrixHandle, CircuitError> {
        let src = self.bind(src)?;
        let shape = self.arena[src].shape();
        self.emit(shape, |dst| build(dst, src))
    }

    pub fn relu(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        self.unary(src, |dst, src| Instruction::Relu { dst, src })
    }

    pub fn cos(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        self.unary(src, |dst, src| Instruction::Cos { dst, src })
    }

    pub fn sin(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        self.unary(src, |dst, src| Instruction::Sin { dst, src })
    }

    pub fn cis(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        self.unary(src, |dst, src| Instruction::Cis { dst, src })
    }

    pub fn sic(&mut self, src: &MatrixHandle) -> Result<MatrixHandle, CircuitError> {
        self.unary(src, |dst, src| Instruction::Sic { dst, src })
    }

    /// Per-row sums placed in column `k`; same shape as `src`.
    pub fn sumk(&mut self, src: &MatrixHandle, k: usize) -> Result<MatrixHandle, CircuitError> {
        let width = src.width();
        if k >= width {
            return Err(CoreError::ColumnOutOfRange {
                operator: "sumk",
                column: k,
                width,
            }
            .into());
        }
        self.unary(src, |dst, src| Instruction::Sumk { dst, src, k })
    }

    fn binary(
        &mut self,
        fst: &MatrixHandle,
        snd: &MatrixHandle,
        shape: impl FnOnce(Shape, Shape) -> Result<Shape, CoreError>,
        fallback: impl FnOnce(Shape, Shape) -> Shape,
        build: impl FnOnce(Slot, Slot, Slot) -> Instruction,
    ) -> Result<MatrixHandle, CircuitError> {
        let fst = self.bind(fst)?;
        let snd = self.bind(snd)?;
        let (a, b) = (self.arena[fst].shape(), self.arena[snd].shape());
        let out = if self.config.validate_on_trace {
            shape(a, b)?
        } else {
            fallback(a, b)
        };
        self.emit(out, |dst| build(dst, fst, snd))
    }

    /// Elementwise sum; both operands must share a shape.
    pub fn add(
        &mut self,
        fst: &MatrixHandle,
        snd: &MatrixHandle,
    ) -> Result<MatrixHandle, CircuitError> {
        self.binary(
            fst,
            snd,
            |a, b| elementwise_shape("add", a, b),
            |a, _| a,
            |dst, fst, snd| Instruction::Add { dst, fst, snd },
        )
    }

    /// Matrix product into a fresh `fst.height x snd.width` buffer.
    pub fn mul(
        &mut self,
        fst: &MatrixHandle,
        snd: &MatrixHandle,
    ) -> Result<MatrixHandle, CircuitError> {
        self.binary(
            fst,
            snd,
            mul_shape,
            |a, b| Shape::new(a.height(), b.width()),
            |dst, fst, snd| Instruction::Mul { dst, fst, snd },
        )
    }

    /// Hadamard product; both operands must share a shape.
    pub fn point(
        &mut self,
        fst: &MatrixHandle,
        snd: &MatrixHandle,
    ) -> Result<MatrixHandle, CircuitError> {
        self.binary(
            fst,
            snd,
            |a, b| elementwise_shape("point", a, b),
            |a, _| a,
            |dst, fst, snd| Instruction::Point { dst, fst, snd },
        )
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("buffers", &self.arena.len())
            .field("instructions", &self.tape.len())
            .field("executions", &self.executions)
            .finish()
    }
}
