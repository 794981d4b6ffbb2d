//! # Intcode VM
//!
//! A small stored-program machine over a flat integer memory that can be
//! paused mid-program and resumed later.
//!
//! ## Core Concepts
//! - **Program**: immutable initial image, shared between machines
//! - **Memory**: bounds-checked working copy with position, immediate and relative addressing
//! - **Opcodes**: decoded from the low digits of a cell, modes from the higher ones
//! - **Executor**: pure per-opcode semantics
//! - **Machine**: run loop and the standby / running / paused / halted state machine
//! - **I/O bridge**: input queue with an optional provider, output sink or outbox
//!
//! ## Usage
//!
//! ```rust
//! use intcode_vm::Machine;
//!
//! let mut machine = Machine::parse("3,0,4,0,99").unwrap();
//! assert_eq!(machine.run_to_halt([7]).unwrap(), Some(7));
//! assert!(machine.is_halted());
//! ```

pub mod config;
pub mod disasm;
pub mod error;
pub mod exec;
pub mod io;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod program;

pub use config::{MachineConfig, UnderrunPolicy};
pub use disasm::{disassemble, listing, Line};
pub use error::{Error, ErrorKind, Result};
pub use exec::Effect;
pub use io::{InputProvider, IoBridge, OutputSink};
pub use machine::{Machine, Snapshot, State, Step};
pub use memory::{Memory, Param, DEFAULT_SCRATCH_CELLS};
pub use opcode::{Instruction, Mode, Opcode, MAX_PARAMS};
pub use program::{Program, Word};
