//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append every mutation before it reaches the MemTable
//! - CRC32 checksums for corruption detection (via the entry codec)
//! - Replay on startup, tolerating a torn record at the tail
//! - Truncation once the MemTable has been flushed to an SSTable
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Record 1                                        │
//! │ ┌─────────┬────────────┬────────────┬─────────┐ │
//! │ │ CRC (4) │ KeyLen (4) │ ValLen (4) │ K + V   │ │
//! │ └─────────┴────────────┴────────────┴─────────┘ │
//! ├─────────────────────────────────────────────────┤
//! │ Record 2 ...                                    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Replaying a WAL whose records already made it into an SSTable (crash
//! between flush and truncation) is harmless: last-write-wins replay of the
//! same entries reproduces the same MemTable state.

mod writer;
mod reader;
mod recovery;

pub use writer::WalWriter;
pub use reader::WalReader;
pub use recovery::{WalRecovery, RecoveryResult};
