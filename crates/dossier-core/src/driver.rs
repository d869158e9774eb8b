//! Driver records as the document store holds them.
//!
//! The profile is the thin envelope that owns a driver's identity and its
//! profile-source documents. Verification requests are appended per
//! submission; only the latest one feeds reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::SourceDocuments;

/// A driver's profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverProfile {
  pub driver_id:  Uuid,
  pub created_at: DateTime<Utc>,
  /// Profile-source documents, keyed camelCase.
  pub documents:  SourceDocuments,
  /// Bumped by every canonical write; the optimistic-concurrency token.
  pub version:    u64,
}

/// One append-only verification submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
  pub request_id:   Uuid,
  pub driver_id:    Uuid,
  pub submitted_at: DateTime<Utc>,
  /// Verification-source documents, keyed snake_case.
  pub documents:    SourceDocuments,
}
