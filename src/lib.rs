//! # lsmlite
//!
//! A minimal embedded log-structured merge key-value engine with:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with partial write handling
//! - Sorted SSTables with sparse indexes and bloom filter sidecars
//! - Full ("everything into one table") compaction
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//!          put                                  get
//!           │                                    │
//! ┌─────────▼──────────┐              ┌──────────▼─────────┐
//! │        WAL         │              │      MemTable      │──hit──► value
//! │     (append)       │              └──────────┬─────────┘
//! └─────────┬──────────┘                         │ miss
//!           │                                    ▼
//! ┌─────────▼──────────┐   flush     ┌─────────────────────┐
//! │      MemTable      │────────────►│ SSTables (newest    │
//! │     (BTreeMap)     │             │ first): bloom →     │
//! └────────────────────┘             │ sparse index → scan │
//!                                    └──────────┬──────────┘
//!                                               │ count > ceiling
//!                                               ▼
//!                                    ┌─────────────────────┐
//!                                    │ Compactor: merge    │
//!                                    │ all into one table  │
//!                                    └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod bloom;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod lock;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use codec::Entry;
pub use config::{Config, WalSyncStrategy};
pub use engine::Engine;
pub use error::{LsmError, Result};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lsmlite
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
