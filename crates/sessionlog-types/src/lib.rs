//! Shared domain types for the sessionlog workspace.

pub mod config;
pub mod diagnostics;
pub mod snapshot;

mod errors;

pub use errors::{Result, SessionLogError};
