//! The per-document verification state machine.
//!
//! ```text
//! pending ──upload──▶ uploaded ──approve──▶ approved
//!                        │  ▲                  │
//!                 reject │  │ upload           │ reject
//!                        ▼  │                  │
//!                      rejected ◀──────────────┘
//! ```
//!
//! Transitions never mutate their input; each returns the next canonical
//! value so callers can keep the previous one for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  Error, Result,
  document::{CanonicalDocument, DocumentStatus, DocumentType, DriverDocumentSet},
};

/// An admin's verdict on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
  Approve,
  Reject {
    #[serde(default)]
    reason: String,
  },
}

/// The kind of transition being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Approve,
  Reject,
  Upload,
}

/// Tunables for transitions whose semantics are a product decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPolicy {
  /// Allow a new upload to reopen an already-approved document.
  pub allow_reupload_after_approval: bool,
}

/// A new submission for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
  pub url:         String,
  pub filename:    Option<String>,
  pub uploaded_at: DateTime<Utc>,
}

fn invalid(from: DocumentStatus, action: Action) -> Error {
  Error::InvalidTransition { from, action }
}

/// Apply an admin decision to `doc`.
///
/// Approving an approved document is a no-op success. A rejection reason is
/// validated before the transition itself.
pub fn apply_decision(
  doc: &CanonicalDocument,
  decision: &Decision,
) -> Result<CanonicalDocument> {
  match decision {
    Decision::Approve => match doc.status {
      DocumentStatus::Approved => Ok(doc.clone()),
      DocumentStatus::Uploaded | DocumentStatus::Rejected => {
        let mut next = doc.clone();
        next.status = DocumentStatus::Approved;
        next.rejection_reason = None;
        Ok(next.settled())
      }
      DocumentStatus::Pending => Err(invalid(doc.status, Action::Approve)),
    },
    Decision::Reject { reason } => {
      let reason = reason.trim();
      if reason.is_empty() {
        return Err(Error::MissingReason);
      }
      match doc.status {
        DocumentStatus::Uploaded | DocumentStatus::Approved => {
          let mut next = doc.clone();
          next.status = DocumentStatus::Rejected;
          next.rejection_reason = Some(reason.to_owned());
          Ok(next.settled())
        }
        DocumentStatus::Pending | DocumentStatus::Rejected => {
          Err(invalid(doc.status, Action::Reject))
        }
      }
    }
  }
}

/// Record a new submission for `doc`.
///
/// Replacing an upload that is still awaiting review is allowed. Uploading
/// over an approved document depends on `policy`.
pub fn apply_upload(
  doc: &CanonicalDocument,
  upload: &Upload,
  policy: TransitionPolicy,
) -> Result<CanonicalDocument> {
  let url = upload.url.trim();
  if url.is_empty() {
    return Err(Error::MissingUrl);
  }
  if doc.status == DocumentStatus::Approved && !policy.allow_reupload_after_approval {
    return Err(invalid(doc.status, Action::Upload));
  }

  Ok(
    CanonicalDocument {
      url:              url.to_owned(),
      status:           DocumentStatus::Uploaded,
      filename:         upload.filename.clone().or_else(|| doc.filename.clone()),
      uploaded_at:      Some(upload.uploaded_at),
      verified:         false,
      rejection_reason: None,
    }
    .settled(),
  )
}

/// Check a new verification request against the upload rule.
///
/// `current` is the set reconciled before the request is appended and
/// `candidate` the set it would reconcile to afterwards. Unless `policy`
/// allows re-upload, a request may not change the url or status of an
/// approved document; the first offending type is reported.
pub fn admit_submission(
  current: &DriverDocumentSet,
  candidate: &DriverDocumentSet,
  policy: TransitionPolicy,
) -> Result<(), (DocumentType, Error)> {
  if policy.allow_reupload_after_approval {
    return Ok(());
  }
  for (doc_type, doc) in current.iter() {
    let next = candidate.get(doc_type);
    if doc.status == DocumentStatus::Approved
      && (next.status != doc.status || next.url != doc.url)
    {
      return Err((doc_type, invalid(doc.status, Action::Upload)));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn doc(status: DocumentStatus) -> CanonicalDocument {
    let mut doc = CanonicalDocument::missing();
    if status != DocumentStatus::Pending {
      doc.url = "https://files/doc.pdf".into();
    }
    doc.status = status;
    doc.rejection_reason = Some("blurry".into());
    doc.settled()
  }

  fn reject(reason: &str) -> Decision {
    Decision::Reject {
      reason: reason.into(),
    }
  }

  fn upload(url: &str) -> Upload {
    Upload {
      url:         url.into(),
      filename:    Some("new.pdf".into()),
      uploaded_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
    }
  }

  #[test]
  fn approve_from_uploaded_and_rejected() {
    for from in [DocumentStatus::Uploaded, DocumentStatus::Rejected] {
      let next = apply_decision(&doc(from), &Decision::Approve).unwrap();
      assert_eq!(next.status, DocumentStatus::Approved);
      assert!(next.verified);
      assert!(next.rejection_reason.is_none());
    }
  }

  #[test]
  fn approve_is_idempotent() {
    let approved = doc(DocumentStatus::Approved);
    let next = apply_decision(&approved, &Decision::Approve).unwrap();
    assert_eq!(next, approved);
  }

  #[test]
  fn approve_from_pending_is_invalid() {
    let err = apply_decision(&doc(DocumentStatus::Pending), &Decision::Approve)
      .unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition {
        from:   DocumentStatus::Pending,
        action: Action::Approve,
      }
    ));
  }

  #[test]
  fn reject_sets_reason_and_revokes_approval() {
    for from in [DocumentStatus::Uploaded, DocumentStatus::Approved] {
      let next = apply_decision(&doc(from), &reject("  expired  ")).unwrap();
      assert_eq!(next.status, DocumentStatus::Rejected);
      assert!(!next.verified);
      assert_eq!(next.rejection_reason.as_deref(), Some("expired"));
    }
  }

  #[test]
  fn reject_requires_reason_and_leaves_input_untouched() {
    let before = doc(DocumentStatus::Uploaded);
    let snapshot = before.clone();
    for reason in ["", "   "] {
      let err = apply_decision(&before, &reject(reason)).unwrap_err();
      assert!(matches!(err, Error::MissingReason));
    }
    assert_eq!(before, snapshot);
  }

  #[test]
  fn missing_reason_is_reported_before_state_check() {
    let err = apply_decision(&doc(DocumentStatus::Pending), &reject("")).unwrap_err();
    assert!(matches!(err, Error::MissingReason));
  }

  #[test]
  fn reject_from_pending_or_rejected_is_invalid() {
    for from in [DocumentStatus::Pending, DocumentStatus::Rejected] {
      let err = apply_decision(&doc(from), &reject("bad")).unwrap_err();
      assert!(matches!(err, Error::InvalidTransition { action: Action::Reject, .. }));
    }
  }

  #[test]
  fn upload_moves_to_uploaded() {
    for from in [
      DocumentStatus::Pending,
      DocumentStatus::Uploaded,
      DocumentStatus::Rejected,
    ] {
      let next =
        apply_upload(&doc(from), &upload("https://files/new.pdf"), TransitionPolicy::default())
          .unwrap();
      assert_eq!(next.status, DocumentStatus::Uploaded);
      assert_eq!(next.url, "https://files/new.pdf");
      assert_eq!(next.filename.as_deref(), Some("new.pdf"));
      assert!(next.rejection_reason.is_none());
    }
  }

  #[test]
  fn upload_over_approval_follows_policy() {
    let approved = doc(DocumentStatus::Approved);
    let err = apply_upload(&approved, &upload("u2"), TransitionPolicy::default())
      .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { action: Action::Upload, .. }));

    let reopen = TransitionPolicy {
      allow_reupload_after_approval: true,
    };
    let next = apply_upload(&approved, &upload("u2"), reopen).unwrap();
    assert_eq!(next.status, DocumentStatus::Uploaded);
    assert!(!next.verified);
  }

  #[test]
  fn upload_requires_url() {
    let err = apply_upload(
      &doc(DocumentStatus::Pending),
      &upload(" "),
      TransitionPolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingUrl));
  }

  #[test]
  fn submission_may_not_reopen_approved_documents() {
    let current = DriverDocumentSet::default()
      .with(DocumentType::DrivingLicense, doc(DocumentStatus::Approved))
      .with(DocumentType::Aadhaar, doc(DocumentStatus::Uploaded));

    let mut replaced = doc(DocumentStatus::Uploaded);
    replaced.url = "https://files/new.pdf".into();
    let reopened = current.with(DocumentType::DrivingLicense, replaced);
    let (doc_type, err) =
      admit_submission(&current, &reopened, TransitionPolicy::default()).unwrap_err();
    assert_eq!(doc_type, DocumentType::DrivingLicense);
    assert!(matches!(
      err,
      Error::InvalidTransition { from: DocumentStatus::Approved, action: Action::Upload }
    ));

    let lenient = TransitionPolicy {
      allow_reupload_after_approval: true,
    };
    assert!(admit_submission(&current, &reopened, lenient).is_ok());
  }

  #[test]
  fn submission_may_touch_undecided_documents() {
    let current = DriverDocumentSet::default()
      .with(DocumentType::DrivingLicense, doc(DocumentStatus::Approved));
    let mut aadhaar = doc(DocumentStatus::Uploaded);
    aadhaar.url = "https://files/aadhaar.pdf".into();
    let candidate = current.with(DocumentType::Aadhaar, aadhaar);

    assert!(admit_submission(&current, &current, TransitionPolicy::default()).is_ok());
    assert!(admit_submission(&current, &candidate, TransitionPolicy::default()).is_ok());
  }

  #[test]
  fn decisions_parse_from_json() {
    let approve: Decision = serde_json::from_str(r#"{"decision":"approve"}"#).unwrap();
    assert_eq!(approve, Decision::Approve);
    let reject: Decision =
      serde_json::from_str(r#"{"decision":"reject","reason":"expired"}"#).unwrap();
    assert_eq!(reject, Decision::Reject { reason: "expired".into() });
    let bare: Decision = serde_json::from_str(r#"{"decision":"reject"}"#).unwrap();
    assert_eq!(bare, Decision::Reject { reason: String::new() });
  }
}
