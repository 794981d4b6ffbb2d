//! # Working Memory
//!
//! A fixed-capacity, bounds-checked integer store owned by one machine.
//! The capacity is declared at construction as the program length plus a
//! scratch margin; cells past the program read as zero until written.
//! Nothing grows on demand: an access outside `0..capacity` is an error.

use crate::error::{self, Result};
use crate::opcode::Mode;
use crate::program::{Program, Word};

/// Default scratch cells provisioned past the end of the program
pub const DEFAULT_SCRATCH_CELLS: usize = 4096;

/// A resolved parameter: where it lives and what it holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Param {
    /// Storage location. For immediate parameters this is the operand cell itself.
    pub address: Word,
    /// Value read from `address`
    pub value: Word,
}

/// Machine memory - the program image plus its mutable working copy
#[derive(Debug, Clone)]
pub struct Memory {
    program: Program,
    cells: Vec<Word>,
}

impl Memory {
    /// Copy `program` into a store of `program.len() + scratch` cells
    pub fn new(program: Program, scratch: usize) -> Self {
        let mut cells = vec![0; program.len() + scratch];
        cells[..program.len()].copy_from_slice(program.as_slice());
        Self { program, cells }
    }

    /// Total addressable cells
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// The immutable initial image
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The working copy
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Read one cell
    pub fn read(&self, address: Word) -> Result<Word> {
        let index = self.index(address).map_err(|e| e.with_operation("memory::read"))?;
        Ok(self.cells[index])
    }

    /// Write one cell
    pub fn write(&mut self, address: Word, value: Word) -> Result<()> {
        let index = self.index(address).map_err(|e| e.with_operation("memory::write"))?;
        self.cells[index] = value;
        Ok(())
    }

    /// Resolve the operand stored at `slot` according to `mode`
    pub fn resolve(&self, slot: Word, mode: Mode, relative_base: Word) -> Result<Param> {
        let operand = self.read(slot)?;
        let address = match mode {
            Mode::Position => operand,
            Mode::Immediate => slot,
            Mode::Relative => relative_base.saturating_add(operand),
        };
        let value = self.read(address)?;
        Ok(Param { address, value })
    }

    /// Restore the program image and zero the scratch area
    pub fn reset(&mut self) {
        let len = self.program.len();
        self.cells[..len].copy_from_slice(self.program.as_slice());
        self.cells[len..].fill(0);
    }

    /// Working cells up to the last one that differs from zero, but never
    /// shorter than the program
    pub fn used(&self) -> &[Word] {
        let end = self
            .cells
            .iter()
            .rposition(|&cell| cell != 0)
            .map_or(0, |i| i + 1)
            .max(self.program.len());
        &self.cells[..end]
    }

    fn index(&self, address: Word) -> Result<usize> {
        if address < 0 {
            return Err(error::negative_address(address));
        }
        match usize::try_from(address) {
            Ok(index) if index < self.cells.len() => Ok(index),
            _ => Err(error::out_of_bounds(address, self.cells.len())),
        }
    }
}
