//! # Circuit - Staged Matrix Programs
//!
//! Circuits describe matrix computations as morphisms in a symmetric monoidal
//! category. Running one is a two-stage affair:
//!
//! 1. **Trace**: [`Circuit::apply`] walks the circuit against a [`Runtime`],
//!    allocating destination buffers and recording [`Instruction`]s.
//! 2. **Execute**: [`Runtime::execute`] replays the tape against the arena.
//!
//! ## Example
//!
//! ```rust
//! use monoidal_circuit::{Circuit, Ob, Runtime};
//! use monoidal_core::Shape;
//!
//! let double = Circuit::constant(Shape::new(1, 2), vec![3.0, 4.0])
//!     .seq(Circuit::copy())
//!     .seq(Circuit::add());
//!
//! let mut rt = Runtime::new();
//! let out = double.apply(Ob::Unit, &mut rt).unwrap().as_matrix().unwrap();
//! rt.execute().unwrap();
//! assert_eq!(rt.read(&out).unwrap(), &[6.0, 8.0]);
//! ```

pub mod circuit;
pub mod config;
pub mod error;
pub mod instruction;
pub mod ob;
pub mod runtime;

pub use circuit::{Circuit, Opcode, Operator, Parameter};
pub use config::RuntimeConfig;
pub use error::CircuitError;
pub use instruction::{Instruction, Slot};
pub use ob::{MatrixHandle, Ob};
pub use runtime::{Runtime, RuntimeId};
