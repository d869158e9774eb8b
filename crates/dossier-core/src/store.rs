//! The `DriverStore` trait — the document store as seen by the engine.
//!
//! The trait is implemented by storage backends (e.g. `dossier-store-sqlite`).
//! The engine reads both sources through it and writes the canonical state
//! back through [`DriverStore::write_canonical_state`], which is the only
//! path by which an aggregate status reaches storage.

use std::future::Future;

use uuid::Uuid;

use crate::{
  aggregate::DriverAggregateStatus,
  document::{DriverDocumentSet, SourceDocuments},
  driver::{DriverProfile, VerificationRequest},
};

/// Result of a version-checked canonical write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// Every location was updated; the driver is now at `version`.
  Written { version: u64 },
  /// Nothing was written: the driver moved on to `actual` concurrently.
  Stale { actual: u64 },
  /// Nothing was written: the driver does not exist.
  Missing,
}

/// Abstraction over the document store holding driver records.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DriverStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Ingest ────────────────────────────────────────────────────────────

  /// Create a driver whose profile carries `documents`.
  fn add_driver(
    &self,
    documents: SourceDocuments,
  ) -> impl Future<Output = Result<DriverProfile, Self::Error>> + Send + '_;

  /// Append a verification request. Earlier requests are kept untouched.
  fn append_verification_request(
    &self,
    driver_id: Uuid,
    documents: SourceDocuments,
  ) -> impl Future<Output = Result<VerificationRequest, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All driver ids, oldest first.
  fn list_drivers(
    &self,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// The profile record, or `None` if the driver does not exist.
  fn get_profile(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Option<DriverProfile>, Self::Error>> + Send + '_;

  /// The most recently submitted verification request, if any.
  fn get_latest_verification_request(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>>
  + Send
  + '_;

  /// The aggregate last persisted for the driver, if any.
  fn get_cached_aggregate(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Option<DriverAggregateStatus>, Self::Error>>
  + Send
  + '_;

  // ── Canonical write-back ──────────────────────────────────────────────

  /// Write `set` and `aggregate` to every location that stores a copy of
  /// document status, all-or-nothing, if the driver is still at
  /// `expected_version`.
  fn write_canonical_state<'a>(
    &'a self,
    driver_id: Uuid,
    set: &'a DriverDocumentSet,
    aggregate: &'a DriverAggregateStatus,
    expected_version: u64,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;
}
