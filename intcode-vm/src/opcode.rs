//! # Opcodes and Instruction Decoding
//!
//! An instruction cell packs its opcode in the two lowest decimal digits
//! and one addressing mode per parameter in the digits above:
//!
//! ```text
//!   1002  ->  opcode 02 (multiply)
//!             param 0: mode 0 (position)
//!             param 1: mode 1 (immediate)
//!             param 2: mode 0 (position)
//! ```
//!
//! Argument counts come from an exhaustive match, so decoding never needs
//! anything but the raw cell.

use crate::error::{self, Result};
use crate::program::Word;
use serde::{Deserialize, Serialize};

/// Most parameters any instruction takes
pub const MAX_PARAMS: usize = 3;

/// Operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    /// `c = a + b`
    Add,
    /// `c = a * b`
    Multiply,
    /// Read one value from input into `a`
    Input,
    /// Emit `a`
    Output,
    /// Jump to `b` when `a != 0`
    JumpIfTrue,
    /// Jump to `b` when `a == 0`
    JumpIfFalse,
    /// `c = (a < b) as Word`
    LessThan,
    /// `c = (a == b) as Word`
    Equals,
    /// Relative base += `a`
    AdjustBase,
    /// Stop the machine
    Halt,
}

impl Opcode {
    /// Look up the opcode for the two low digits of a cell
    pub fn from_code(code: Word) -> Option<Self> {
        Some(match code {
            1 => Opcode::Add,
            2 => Opcode::Multiply,
            3 => Opcode::Input,
            4 => Opcode::Output,
            5 => Opcode::JumpIfTrue,
            6 => Opcode::JumpIfFalse,
            7 => Opcode::LessThan,
            8 => Opcode::Equals,
            9 => Opcode::AdjustBase,
            99 => Opcode::Halt,
            _ => return None,
        })
    }

    /// Numeric code as it appears in memory
    pub fn code(self) -> Word {
        match self {
            Opcode::Add => 1,
            Opcode::Multiply => 2,
            Opcode::Input => 3,
            Opcode::Output => 4,
            Opcode::JumpIfTrue => 5,
            Opcode::JumpIfFalse => 6,
            Opcode::LessThan => 7,
            Opcode::Equals => 8,
            Opcode::AdjustBase => 9,
            Opcode::Halt => 99,
        }
    }

    /// Number of parameters following the instruction cell
    pub const fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Index of the parameter this opcode writes to, if any
    pub const fn write_param(self) -> Option<usize> {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => Some(2),
            Opcode::Input => Some(0),
            _ => None,
        }
    }

    /// Short assembly name
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustBase => "ARB",
            Opcode::Halt => "HALT",
        }
    }
}

/// How a parameter resolves to a storage location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The operand is an address
    #[default]
    Position,
    /// The operand is the value itself
    Immediate,
    /// The operand is an offset from the relative base
    Relative,
}

impl Mode {
    /// Map a mode digit
    pub fn from_digit(digit: Word) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }
}

/// A decoded instruction cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The raw cell value
    pub raw: Word,
    pub opcode: Opcode,
    /// Modes for the first `opcode.arity()` parameters; the rest stay `Position`
    pub modes: [Mode; MAX_PARAMS],
}

impl Instruction {
    /// Split a raw cell into opcode and parameter modes.
    ///
    /// Mode digits above the opcode's arity are ignored. A written parameter
    /// in immediate mode is rejected here so execution never sees one.
    pub fn decode(raw: Word) -> Result<Self> {
        let opcode = Opcode::from_code(raw % 100).ok_or_else(|| error::invalid_opcode(raw))?;

        let mut modes = [Mode::Position; MAX_PARAMS];
        let mut divisor = 100;
        for (i, mode) in modes.iter_mut().enumerate().take(opcode.arity()) {
            *mode = Mode::from_digit((raw / divisor) % 10).ok_or_else(|| error::invalid_mode(raw, i))?;
            divisor *= 10;
        }

        if let Some(target) = opcode.write_param() {
            if modes[target] == Mode::Immediate {
                return Err(error::immediate_write(raw, target));
            }
        }

        Ok(Self { raw, opcode, modes })
    }

    /// Number of cells the instruction occupies, itself included
    pub fn width(&self) -> usize {
        1 + self.opcode.arity()
    }

    /// Modes of the parameters this instruction actually uses
    pub fn param_modes(&self) -> &[Mode] {
        &self.modes[..self.opcode.arity()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_code_round_trip() {
        for code in [1, 2, 3, 4, 5, 6, 7, 8, 9, 99] {
            let op = Opcode::from_code(code).unwrap();
            assert_eq!(op.code(), code);
        }
        assert_eq!(Opcode::from_code(0), None);
        assert_eq!(Opcode::from_code(10), None);
        assert_eq!(Opcode::from_code(98), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(Opcode::Add.arity(), 3);
        assert_eq!(Opcode::Equals.arity(), 3);
        assert_eq!(Opcode::JumpIfFalse.arity(), 2);
        assert_eq!(Opcode::Input.arity(), 1);
        assert_eq!(Opcode::AdjustBase.arity(), 1);
        assert_eq!(Opcode::Halt.arity(), 0);
    }

    #[test]
    fn test_decode_modes() {
        let instr = Instruction::decode(1002).unwrap();
        assert_eq!(instr.opcode, Opcode::Multiply);
        assert_eq!(instr.modes, [Mode::Position, Mode::Immediate, Mode::Position]);
        assert_eq!(instr.width(), 4);

        let instr = Instruction::decode(21107).unwrap();
        assert_eq!(instr.opcode, Opcode::LessThan);
        assert_eq!(instr.modes, [Mode::Immediate, Mode::Immediate, Mode::Relative]);

        let instr = Instruction::decode(204).unwrap();
        assert_eq!(instr.opcode, Opcode::Output);
        assert_eq!(instr.param_modes(), &[Mode::Relative]);
    }

    #[test]
    fn test_decode_ignores_digits_beyond_arity() {
        let instr = Instruction::decode(11199).unwrap();
        assert_eq!(instr.opcode, Opcode::Halt);
        assert_eq!(instr.modes, [Mode::Position; MAX_PARAMS]);
        assert_eq!(instr.width(), 1);
    }

    #[test]
    fn test_decode_errors() {
        assert!(Instruction::decode(42).is_err_and(|e| e.kind() == ErrorKind::InvalidOpcode));
        assert!(Instruction::decode(0).is_err_and(|e| e.kind() == ErrorKind::InvalidOpcode));
        assert!(Instruction::decode(-1).is_err_and(|e| e.kind() == ErrorKind::InvalidOpcode));
        assert!(Instruction::decode(301).is_err_and(|e| e.kind() == ErrorKind::InvalidMode));
        assert!(Instruction::decode(10001).is_err_and(|e| e.kind() == ErrorKind::ImmediateWrite));
        assert!(Instruction::decode(103).is_err_and(|e| e.kind() == ErrorKind::ImmediateWrite));
        assert!(Instruction::decode(203).is_ok());
    }
}
