//! # Programs
//!
//! The immutable initial image of a machine. A program is shared between
//! every machine built from it and never changes after construction; each
//! machine copies it into its own working memory.

use crate::disasm::{self, Line};
use crate::error::{self, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// A single memory cell / machine value
pub type Word = i64;

/// An immutable sequence of cells, cheap to clone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    cells: Arc<[Word]>,
}

impl Program {
    /// Create a program from its cells
    pub fn new(cells: impl Into<Vec<Word>>) -> Self {
        Self {
            cells: Arc::from(cells.into()),
        }
    }

    /// Parse the comma-separated text form, e.g. `1,0,0,0,99`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::parse_failed("program text is empty").with_operation("program::parse"));
        }

        let cells = text
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<Word>().map_err(|e| {
                    error::bad_token(index, token)
                        .with_operation("program::parse")
                        .set_source(e)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(cells))
    }

    /// Read and parse a program file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("program::from_file")
                .with_context("path", path.display().to_string())
        })?;
        Self::parse(&text).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the program has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at `address`, if inside the program
    pub fn get(&self, address: usize) -> Option<Word> {
        self.cells.get(address).copied()
    }

    /// All cells
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Disassembly listing of the whole image
    pub fn disassemble(&self) -> Vec<Line> {
        disasm::disassemble(&self.cells)
    }

    /// Print the disassembly listing to stdout
    pub fn pretty_print(&self) {
        println!("{} cells", self.len());
        for line in self.disassemble() {
            println!("{}", line);
        }
    }
}

impl From<Vec<Word>> for Program {
    fn from(cells: Vec<Word>) -> Self {
        Self::new(cells)
    }
}

impl From<&[Word]> for Program {
    fn from(cells: &[Word]) -> Self {
        Self {
            cells: Arc::from(cells),
        }
    }
}

impl FromStr for Program {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}
