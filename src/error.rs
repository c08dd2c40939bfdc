//! Error types for lsmlite
//!
//! Provides a unified error type for all operations.
//!
//! Record-level decode failures are deliberately absent: a malformed or
//! partial record is skipped by the codec and never reaches the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LsmError
pub type Result<T> = std::result::Result<T, LsmError>;

/// Unified error type for lsmlite operations
#[derive(Debug, Error)]
pub enum LsmError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // On-disk Artifact Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Not an SSTable file name: {}", .0.display())]
    InvalidTableName(PathBuf),

    // -------------------------------------------------------------------------
    // Caller Errors (structural invariants and preconditions)
    // -------------------------------------------------------------------------
    #[error("Unsorted input: key {current:?} does not follow {previous:?}")]
    UnsortedInput { previous: Vec<u8>, current: Vec<u8> },

    #[error("Entry too large: key {key_len} bytes, value {value_len} bytes (limit 4294967295 each)")]
    EntryTooLarge { key_len: usize, value_len: usize },

    #[error("Nothing to compact: at least one SSTable is required")]
    NothingToCompact,

    // -------------------------------------------------------------------------
    // Engine Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Data directory is locked by another engine: {}", .0.display())]
    DirectoryLocked(PathBuf),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
