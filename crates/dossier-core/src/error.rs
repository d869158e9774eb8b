//! Error types for `dossier-core`.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::{
  document::{DocumentStatus, DriverDocumentSet},
  verification::Action,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("driver not found: {0}")]
  DriverNotFound(Uuid),

  #[error("unknown document type: {0:?}")]
  UnknownDocumentType(String),

  #[error("a rejection requires a non-empty reason")]
  MissingReason,

  #[error("an upload requires a non-empty url")]
  MissingUrl,

  #[error("cannot {action} a document that is {from}")]
  InvalidTransition {
    from:   DocumentStatus,
    action: Action,
  },

  #[error(
    "stale write for driver {driver_id}: expected version {expected}, store is at {actual}"
  )]
  StaleWrite {
    driver_id: Uuid,
    expected:  u64,
    actual:    u64,
  },

  #[error("persist did not complete within {0:?}")]
  PersistTimeout(Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Every attempt hit a retryable failure. Carries the canonical state
  /// reconciled on the final attempt so an operator can inspect it.
  #[error("gave up on driver {driver_id} after {attempts} attempts: {last}")]
  RetriesExhausted {
    driver_id:  Uuid,
    attempts:   u32,
    last:       Box<Error>,
    last_known: Box<DriverDocumentSet>,
  },
}

impl Error {
  /// Malformed caller input, as opposed to a state or store problem.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::UnknownDocumentType(_) | Self::MissingReason | Self::MissingUrl
    )
  }

  /// Failures that warrant a fresh reconcile and another persist attempt.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StaleWrite { .. } | Self::PersistTimeout(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
