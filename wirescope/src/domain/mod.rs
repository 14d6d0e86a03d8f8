//! Domain model for wirescope
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling mapped onto one shared error taxonomy

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{ConnId, Direction, Pid, Timestamp};

pub use errors::{DecodeError, ElfError, ErrorKind, ExportError, StoreError};
