//! Machine configuration

use crate::memory::DEFAULT_SCRATCH_CELLS;
use serde::{Deserialize, Serialize};

/// What a read does when the queue is empty and no provider answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderrunPolicy {
    /// Read zero and log a warning (legacy behaviour)
    #[default]
    Zero,
    /// Fail the machine with `InputUnderrun`
    Error,
}

/// Construction-time settings for a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Cells provisioned past the end of the program
    pub scratch_cells: usize,
    /// Input underrun behaviour for runs that do not pause on input
    pub underrun: UnderrunPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            scratch_cells: DEFAULT_SCRATCH_CELLS,
            underrun: UnderrunPolicy::Zero,
        }
    }
}

impl MachineConfig {
    /// Default scratch space, underruns are errors
    pub fn strict() -> Self {
        Self {
            underrun: UnderrunPolicy::Error,
            ..Self::default()
        }
    }

    /// Override the scratch margin
    pub fn with_scratch(mut self, scratch_cells: usize) -> Self {
        self.scratch_cells = scratch_cells;
        self
    }

    /// Override the underrun policy
    pub fn with_underrun(mut self, underrun: UnderrunPolicy) -> Self {
        self.underrun = underrun;
        self
    }
}
