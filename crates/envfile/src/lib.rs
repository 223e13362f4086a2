//! Dotenv-backed configuration engine.
//!
//! This crate reads a `KEY=VALUE` file into an ordered in-memory mapping,
//! supports typed access, mutation with write-through persistence, POSIX-style
//! `${VAR}` interpolation, and decoding of URL-shaped values into structured
//! database and e-mail configuration.

mod cast;
mod constants;
pub mod decode;
mod document;
mod env;
mod error;
mod file;
mod interpolate;
mod parser;

pub use decode::{
    DatabaseConfig, DatabaseDecoder, DecodeError, EmailConfig, EmailDecoder, IsolationLevel,
    SchemeRegistry,
};
pub use env::{EnvFile, EnvOptions};
pub use error::EnvError;
