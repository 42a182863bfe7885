//! Core types and trait definitions for the FSE clinical record store.
//!
//! This crate has no HTTP, database or HL7 dependencies.
//! It defines the canonical resources ([`Subject`](subject::Subject),
//! [`Observation`](observation::Observation)), the persistence collaborator
//! traits, and the two read-then-write decisions made against a store:
//! identity resolution and observation deduplication.

pub mod dedup;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod observation;
pub mod resolve;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
