//! Error types for the dotenv engine.
//!
//! Responsibilities:
//! - Define error variants for parsing, interpolation, typed access, and
//!   persistence failures.
//! - Provide conversion from lower-level errors (I/O, URL decoding).
//!
//! Does NOT handle:
//! - URL decode errors for direct decoder calls (see `decode::DecodeError`).
//!
//! Invariants:
//! - All variants name the key, line, or value they concern so callers can
//!   report exact locations.
//! - Parsing and decoding are deterministic; no variant is retryable.

use thiserror::Error;

use crate::decode::DecodeError;

/// Errors that can occur while loading, accessing, or mutating a dotenv file.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A line that is neither blank, a comment, nor a valid assignment.
    #[error("Malformed line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },

    /// Interpolation encountered a self-reference or a reference cycle.
    #[error("Circular reference while resolving '{key}'")]
    CircularReference { key: String },

    /// A required variable is absent and no default was supplied.
    #[error("Missing environment variable: '{key}'")]
    KeyNotFound { key: String },

    /// A present value failed coercion to the requested type.
    #[error("Invalid {target} value for '{key}': {value:?}")]
    TypeCast {
        key: String,
        value: String,
        target: &'static str,
    },

    /// A key passed to `set` does not match identifier syntax.
    #[error("Invalid variable name: {key:?}")]
    InvalidKey { key: String },

    /// A stored URL value failed to decode into a configuration object.
    #[error("Invalid URL in '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
