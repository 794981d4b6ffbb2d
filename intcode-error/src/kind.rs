//! Error kinds for intcode operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell a broken program (decode and
/// addressing failures) apart from a broken composition (closed channels,
/// exhausted budgets) or bad input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed to function
    InvalidArgument,

    /// Invalid configuration
    ConfigInvalid,

    /// Failed to parse program text or other input
    ParseFailed,

    // =========================================================================
    // Decode errors
    // =========================================================================
    /// The cell at the instruction pointer decodes to no known opcode
    InvalidOpcode,

    /// A parameter mode digit is not Position, Immediate or Relative
    InvalidMode,

    /// A write parameter was given in immediate mode
    ImmediateWrite,

    // =========================================================================
    // Memory errors
    // =========================================================================
    /// Read or write of a negative address
    NegativeAddress,

    /// Read or write past the provisioned working memory
    AddressOutOfBounds,

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// Input was needed, the queue was empty and the strict policy is active
    InputUnderrun,

    /// A machine is in its failed state; it must be reset before running again
    MachineFailed,

    /// An instruction or round budget ran out before completion
    BudgetExhausted,

    // =========================================================================
    // Orchestration errors
    // =========================================================================
    /// A channel between machines closed unexpectedly
    ChannelClosed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::ParseFailed => "ParseFailed",

            // Decode
            ErrorKind::InvalidOpcode => "InvalidOpcode",
            ErrorKind::InvalidMode => "InvalidMode",
            ErrorKind::ImmediateWrite => "ImmediateWrite",

            // Memory
            ErrorKind::NegativeAddress => "NegativeAddress",
            ErrorKind::AddressOutOfBounds => "AddressOutOfBounds",

            // Execution
            ErrorKind::InputUnderrun => "InputUnderrun",
            ErrorKind::MachineFailed => "MachineFailed",
            ErrorKind::BudgetExhausted => "BudgetExhausted",

            // Orchestration
            ErrorKind::ChannelClosed => "ChannelClosed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Check if this error kind leaves the machine unable to continue.
    ///
    /// Fatal kinds move a machine into its failed state; it only runs
    /// again after a reset.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidOpcode
                | ErrorKind::InvalidMode
                | ErrorKind::ImmediateWrite
                | ErrorKind::NegativeAddress
                | ErrorKind::AddressOutOfBounds
                | ErrorKind::InputUnderrun
                | ErrorKind::MachineFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
