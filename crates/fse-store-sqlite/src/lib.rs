//! SQLite backend for the FSE clinical record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Subjects and observations are stored
//! as JSON documents; the columns next to them exist to enforce identifier
//! uniqueness and the observation natural key.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
