//! # intcode-error
//!
//! Unified error handling for the intcode workspace.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g. InvalidOpcode, AddressOutOfBounds)
//! - **Fatality**: Decide whether the machine can keep going (`ErrorKind::is_fatal`)
//! - **Error Context**: Locate the cause with the instruction pointer, raw cell, address...
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use intcode_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::InvalidOpcode, "opcode 42 is not defined")
//!         .with_operation("machine::step")
//!         .with_context("ip", "17")
//!         .with_context("raw", "1042"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, intcode_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent layers only append context

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using the intcode Error
pub type Result<T> = std::result::Result<T, Error>;
