//! Machine error types
//!
//! Re-exports intcode-error and provides machine-specific constructors.

pub use intcode_error::{Error, ErrorKind, Result};

use crate::program::Word;

/// Create an InvalidOpcode error
pub fn invalid_opcode(raw: Word) -> Error {
    Error::new(ErrorKind::InvalidOpcode, format!("cell {} decodes to no known opcode", raw))
        .with_context("raw", raw.to_string())
        .with_context("opcode", (raw % 100).to_string())
}

/// Create an InvalidMode error
pub fn invalid_mode(raw: Word, param: usize) -> Error {
    Error::new(ErrorKind::InvalidMode, format!("parameter {} of {} has an unknown mode", param, raw))
        .with_context("raw", raw.to_string())
        .with_context("param", param.to_string())
}

/// Create an ImmediateWrite error
pub fn immediate_write(raw: Word, param: usize) -> Error {
    Error::new(
        ErrorKind::ImmediateWrite,
        format!("parameter {} of {} is written but uses immediate mode", param, raw),
    )
    .with_context("raw", raw.to_string())
    .with_context("param", param.to_string())
}

/// Create a NegativeAddress error
pub fn negative_address(address: Word) -> Error {
    Error::new(ErrorKind::NegativeAddress, format!("negative address {}", address))
        .with_context("address", address.to_string())
}

/// Create an AddressOutOfBounds error
pub fn out_of_bounds(address: Word, capacity: usize) -> Error {
    Error::new(
        ErrorKind::AddressOutOfBounds,
        format!("address {} beyond working memory of {} cells", address, capacity),
    )
    .with_context("address", address.to_string())
    .with_context("capacity", capacity.to_string())
}

/// Create an InputUnderrun error
pub fn input_underrun(ip: Word) -> Error {
    Error::new(ErrorKind::InputUnderrun, "input needed but the queue is empty")
        .with_context("ip", ip.to_string())
}

/// Create a MachineFailed error for a machine that already failed
pub fn already_failed() -> Error {
    Error::machine_failed("machine failed earlier, reset it before running again")
}

/// Create a ParseFailed error for a bad program token
pub fn bad_token(index: usize, token: &str) -> Error {
    Error::parse_failed(format!("value {} ('{}') is not an integer", index, token))
        .with_context("index", index.to_string())
        .with_context("token", token.to_string())
}
