//! Core types and the reconciliation engine for driver verification
//! documents.
//!
//! Reconciliation, transitions and aggregate recomputation are pure functions
//! over immutable values. The only I/O goes through the [`store::DriverStore`]
//! trait, which storage backends implement; this crate carries no HTTP or
//! database dependencies.

pub mod aggregate;
pub mod alias;
pub mod document;
pub mod driver;
pub mod engine;
pub mod error;
pub mod merge;
pub mod store;
pub mod verification;

pub use error::{Error, Result};
