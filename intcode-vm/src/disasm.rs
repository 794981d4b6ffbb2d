//! # Disassembler
//!
//! Linear sweep over a memory image. Cells that decode to a complete
//! instruction become one listing line; anything else is shown as data.
//! Intcode freely mixes code and data, so the listing is a reading aid
//! rather than ground truth.

use crate::opcode::{Instruction, Mode};
use crate::program::Word;
use std::fmt;

/// One line of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Address of the first cell
    pub address: usize,
    /// The cells covered by this line
    pub cells: Vec<Word>,
    /// Decoded instruction, `None` for data
    pub instruction: Option<Instruction>,
}

impl Line {
    fn format_parts(&self) -> (&'static str, String) {
        let Some(instruction) = &self.instruction else {
            return ("DATA", self.cells[0].to_string());
        };

        let operands = instruction
            .param_modes()
            .iter()
            .zip(&self.cells[1..])
            .map(|(mode, operand)| format_operand(*mode, *operand))
            .collect::<Vec<_>>()
            .join(", ");

        (instruction.opcode.mnemonic(), operands)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, operands) = self.format_parts();
        let raw = self
            .cells
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{:>5}  {:<24} {:<5} {}", self.address, raw, name, operands)
    }
}

fn format_operand(mode: Mode, operand: Word) -> String {
    match mode {
        Mode::Position => format!("[{}]", operand),
        Mode::Immediate => format!("#{}", operand),
        Mode::Relative if operand < 0 => format!("[rb-{}]", operand.unsigned_abs()),
        Mode::Relative => format!("[rb+{}]", operand),
    }
}

/// Disassemble `cells` from address zero
pub fn disassemble(cells: &[Word]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut address = 0;

    while address < cells.len() {
        let decoded = Instruction::decode(cells[address])
            .ok()
            .filter(|instruction| address + instruction.width() <= cells.len());

        let width = decoded.map_or(1, |instruction| instruction.width());
        lines.push(Line {
            address,
            cells: cells[address..address + width].to_vec(),
            instruction: decoded,
        });
        address += width;
    }

    lines
}

/// Render a full listing, one line per instruction or data cell
pub fn listing(cells: &[Word]) -> String {
    disassemble(cells)
        .iter()
        .map(|line| line.to_string().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn test_disassemble_instructions() {
        let lines = disassemble(&[1002, 4, 3, 4, 33]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].address, 0);
        assert_eq!(lines[0].instruction.map(|i| i.opcode), Some(Opcode::Multiply));
        assert_eq!(lines[0].cells, vec![1002, 4, 3, 4]);
        assert_eq!(lines[1].address, 4);
        assert_eq!(lines[1].instruction, None);
    }

    #[test]
    fn test_truncated_instruction_is_data() {
        // An add needs four cells but only two remain
        let lines = disassemble(&[99, 1, 0]);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].instruction.map(|i| i.opcode), Some(Opcode::Halt));
        assert!(lines[1].instruction.is_none());
        assert!(lines[2].instruction.is_none());
    }

    #[test]
    fn test_operand_rendering() {
        let lines = disassemble(&[21101, 7, -1, -3, 99]);
        let text = lines[0].to_string();
        assert!(text.contains("ADD"));
        assert!(text.contains("#7, #-1, [rb-3]"));

        let text = lines[1].to_string();
        assert!(text.contains("HALT"));
    }

    #[test]
    fn test_listing() {
        let text = listing(&[3, 0, 4, 0, 99]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("IN") && lines[0].contains("[0]"));
        assert!(lines[1].contains("OUT"));
        assert!(lines[2].ends_with("HALT"));
    }
}
