//! Aggregate verification status — derived from a document set, never
//! authored.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::document::{DocumentStatus, DriverDocumentSet};

/// Summary of a driver's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAggregateStatus {
  pub all_approved:  bool,
  pub any_rejected:  bool,
  /// Documents still awaiting an upload or a decision.
  pub pending_count: usize,
}

/// The single-word status shown on the driver listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum OverallStatus {
  /// Every document approved.
  Verified,
  /// At least one document rejected.
  Rejected,
  /// Every document submitted, at least one awaiting a decision.
  InReview,
  /// At least one document not yet submitted.
  Incomplete,
}

/// The listing label for `set`. Rejection outranks a missing upload.
pub fn label(set: &DriverDocumentSet) -> OverallStatus {
  let any = |status: DocumentStatus| set.iter().any(|(_, doc)| doc.status == status);

  if set.iter().all(|(_, doc)| doc.status == DocumentStatus::Approved) {
    OverallStatus::Verified
  } else if any(DocumentStatus::Rejected) {
    OverallStatus::Rejected
  } else if any(DocumentStatus::Pending) {
    OverallStatus::Incomplete
  } else {
    OverallStatus::InReview
  }
}

/// Recompute the aggregate for `set`. Pure; replaying it is always safe.
pub fn recompute(set: &DriverDocumentSet) -> DriverAggregateStatus {
  let mut status = DriverAggregateStatus {
    all_approved:  true,
    any_rejected:  false,
    pending_count: 0,
  };
  for (_, doc) in set.iter() {
    match doc.status {
      DocumentStatus::Approved => {}
      DocumentStatus::Rejected => {
        status.all_approved = false;
        status.any_rejected = true;
      }
      DocumentStatus::Pending | DocumentStatus::Uploaded => {
        status.all_approved = false;
        status.pending_count += 1;
      }
    }
  }
  status
}
