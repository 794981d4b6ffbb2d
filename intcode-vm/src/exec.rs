//! # Executor
//!
//! Per-opcode semantics as a pure function of resolved parameters. The
//! executor never touches memory, registers or I/O; it describes what the
//! instruction wants and the machine applies it.

use crate::memory::Param;
use crate::opcode::Opcode;
use crate::program::Word;

/// What an executed instruction asks the machine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Write `value` to `address`, then advance
    Store { address: Word, value: Word },
    /// Read the next input into `address`, then advance
    Input { address: Word },
    /// Emit a value, then advance
    Output(Word),
    /// Set the instruction pointer; no advance
    Jump(Word),
    /// Add to the relative base, then advance
    AdjustBase(Word),
    /// Nothing to do but advance (untaken jump)
    Advance,
    /// Stop
    Halt,
}

/// Compute the effect of `opcode` given its resolved parameters.
///
/// `params` must hold at least `opcode.arity()` entries.
pub fn execute(opcode: Opcode, params: &[Param]) -> Effect {
    match opcode {
        Opcode::Add => Effect::Store {
            address: params[2].address,
            value: params[0].value.wrapping_add(params[1].value),
        },
        Opcode::Multiply => Effect::Store {
            address: params[2].address,
            value: params[0].value.wrapping_mul(params[1].value),
        },
        Opcode::Input => Effect::Input {
            address: params[0].address,
        },
        Opcode::Output => Effect::Output(params[0].value),
        Opcode::JumpIfTrue => jump_when(params[0].value != 0, params[1].value),
        Opcode::JumpIfFalse => jump_when(params[0].value == 0, params[1].value),
        Opcode::LessThan => Effect::Store {
            address: params[2].address,
            value: Word::from(params[0].value < params[1].value),
        },
        Opcode::Equals => Effect::Store {
            address: params[2].address,
            value: Word::from(params[0].value == params[1].value),
        },
        Opcode::AdjustBase => Effect::AdjustBase(params[0].value),
        Opcode::Halt => Effect::Halt,
    }
}

fn jump_when(condition: bool, target: Word) -> Effect {
    if condition {
        Effect::Jump(target)
    } else {
        Effect::Advance
    }
}
