//! Error types for core parsing and validation.

use thiserror::Error;

/// Errors produced while parsing wire-level representations.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid id length: expected {expected} bytes, got {got}")]
    InvalidIdLength { expected: usize, got: usize },

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
