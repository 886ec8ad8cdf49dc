//! SQLite backend for verification requests and the subject directory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every state transition is a single
//! `BEGIN IMMEDIATE` transaction, and a partial unique index on granted
//! fingerprints backs the duplicate-identity check at commit time.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
