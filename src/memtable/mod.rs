//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Last write wins: at most one live value per key
//! - Track live footprint for flush triggers
//! - Ordered iteration for SSTable creation
//!
//! ## Data Structure Choice
//! A plain BTreeMap: ordered keys are exactly what a flush needs, and the
//! engine already serializes writers, so the table itself carries no lock.

mod table;

pub use table::MemTable;
