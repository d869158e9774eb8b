//! The field merger and the document set reconciler.
//!
//! The profile record is the baseline. A verification-request entry overrides
//! it only when it carries a URL; an entry without one is a submission that
//! never happened and must not blank a document the profile already has.

use crate::document::{
  CanonicalDocument, DocumentStatus, DocumentType, DriverDocumentSet,
  SourceDocumentRecord, SourceDocuments, SourceKind,
};

/// Map a raw status string onto [`DocumentStatus`].
///
/// Matching is trimmed and case-insensitive; unrecognised strings fall back
/// to `Pending`. An absent status is inferred from the rest of the record.
pub fn normalize_status(raw: Option<&str>, record: &SourceDocumentRecord) -> DocumentStatus {
  let Some(raw) = raw else {
    return if record.verified == Some(true) {
      DocumentStatus::Approved
    } else if record.has_url() {
      DocumentStatus::Uploaded
    } else {
      DocumentStatus::Pending
    };
  };

  match raw.trim().to_ascii_lowercase().as_str() {
    "uploaded" => DocumentStatus::Uploaded,
    "pending" => DocumentStatus::Pending,
    "approved" | "verified" => DocumentStatus::Approved,
    "rejected" => DocumentStatus::Rejected,
    _ => DocumentStatus::Pending,
  }
}

fn from_record(record: &SourceDocumentRecord) -> CanonicalDocument {
  CanonicalDocument {
    url:              record.url.as_deref().map(str::trim).unwrap_or_default().to_owned(),
    status:           normalize_status(record.status.as_deref(), record),
    filename:         record.filename.clone(),
    uploaded_at:      record.uploaded_at,
    verified:         false,
    rejection_reason: record.rejection_reason.clone(),
  }
}

/// Merge one document type's two source records into its canonical value.
///
/// A submission with a URL replaces the profile's `url` and `status`.
/// `filename`, `uploadedAt` and `rejectionReason` are taken from it when it
/// carries them and otherwise kept from the profile, so a sparse submission
/// does not erase what the profile already recorded.
///
/// A document without a URL is `pending` whatever status its record claims:
/// nothing was submitted, so there is nothing to approve or reject.
pub fn merge(
  profile: Option<&SourceDocumentRecord>,
  verification: Option<&SourceDocumentRecord>,
) -> CanonicalDocument {
  let mut doc = profile.map(from_record).unwrap_or_else(CanonicalDocument::missing);

  if let Some(submission) = verification.filter(|v| v.has_url()) {
    let latest = from_record(submission);
    doc.url = latest.url;
    doc.status = latest.status;
    doc.filename = latest.filename.or(doc.filename);
    doc.uploaded_at = latest.uploaded_at.or(doc.uploaded_at);
    doc.rejection_reason = latest.rejection_reason.or(doc.rejection_reason);
  }

  if !doc.has_url() {
    doc.status = DocumentStatus::Pending;
  }
  doc.settled()
}

/// Reconcile both sources into a complete [`DriverDocumentSet`].
///
/// Total over its inputs: every document type gets an entry however sparse
/// the sources are.
pub fn reconcile(
  profile: &SourceDocuments,
  verification: Option<&SourceDocuments>,
) -> DriverDocumentSet {
  DriverDocumentSet::from_fn(|doc_type: DocumentType| {
    let from_profile = profile.record(doc_type, SourceKind::Profile);
    let from_request =
      verification.and_then(|v| v.record(doc_type, SourceKind::Verification));
    merge(from_profile.as_ref(), from_request.as_ref())
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use strum::EnumCount;

  use super::*;

  fn docs(value: serde_json::Value) -> SourceDocuments {
    SourceDocuments::from_value(value)
  }

  fn profile_rec(url: &str, status: &str) -> SourceDocumentRecord {
    SourceDocumentRecord {
      url: Some(url.into()),
      status: Some(status.into()),
      ..SourceDocumentRecord::default()
    }
  }

  #[test]
  fn both_absent_is_pending_and_empty() {
    let doc = merge(None, None);
    assert_eq!(doc, CanonicalDocument::missing());
  }

  #[test]
  fn verification_url_takes_precedence() {
    let profile = profile_rec("A", "uploaded");
    let verification = profile_rec("B", "uploaded");
    assert_eq!(merge(Some(&profile), Some(&verification)).url, "B");
  }

  #[test]
  fn verification_without_url_never_blanks_profile() {
    let profile = profile_rec("X", "uploaded");
    for url in [None, Some(String::new()), Some("   ".to_owned())] {
      let verification = SourceDocumentRecord {
        url,
        status: Some("pending".into()),
        ..SourceDocumentRecord::default()
      };
      let doc = merge(Some(&profile), Some(&verification));
      assert_eq!(doc.url, "X");
      assert_eq!(doc.status, DocumentStatus::Uploaded);
    }
  }

  #[test]
  fn verification_alone_without_url_stays_pending() {
    let verification = SourceDocumentRecord {
      status: Some("rejected".into()),
      rejection_reason: Some("blurry".into()),
      ..SourceDocumentRecord::default()
    };
    assert_eq!(merge(None, Some(&verification)), CanonicalDocument::missing());
  }

  #[test]
  fn profile_status_without_url_is_pending() {
    let cases = [
      json!({ "status": "approved" }),
      json!({ "status": "approved", "verified": true }),
      json!({ "url": 42, "status": "rejected", "rejectionReason": "expired" }),
      json!({ "url": "   ", "status": "uploaded" }),
    ];
    for raw in cases {
      let profile = SourceDocumentRecord::from_value(&raw, SourceKind::Profile).unwrap();
      let doc = merge(Some(&profile), None);
      assert_eq!(doc, CanonicalDocument::missing(), "raw = {raw}");
    }
  }

  #[test]
  fn override_keeps_profile_filename_when_submission_has_none() {
    let mut profile = profile_rec("A", "uploaded");
    profile.filename = Some("license.jpg".into());
    let verification = profile_rec("B", "uploaded");
    let doc = merge(Some(&profile), Some(&verification));
    assert_eq!(doc.filename.as_deref(), Some("license.jpg"));
  }

  #[test]
  fn status_strings_normalise() {
    let rec = SourceDocumentRecord::default();
    let cases = [
      ("uploaded", DocumentStatus::Uploaded),
      ("pending", DocumentStatus::Pending),
      ("approved", DocumentStatus::Approved),
      ("Verified", DocumentStatus::Approved),
      (" REJECTED ", DocumentStatus::Rejected),
      ("under_review", DocumentStatus::Pending),
      ("", DocumentStatus::Pending),
    ];
    for (raw, expected) in cases {
      assert_eq!(normalize_status(Some(raw), &rec), expected, "raw = {raw:?}");
    }
  }

  #[test]
  fn absent_status_is_inferred() {
    let with_url = SourceDocumentRecord {
      url: Some("u".into()),
      ..SourceDocumentRecord::default()
    };
    assert_eq!(normalize_status(None, &with_url), DocumentStatus::Uploaded);

    let verified = SourceDocumentRecord {
      verified: Some(true),
      ..with_url.clone()
    };
    assert_eq!(normalize_status(None, &verified), DocumentStatus::Approved);
    assert_eq!(
      normalize_status(None, &SourceDocumentRecord::default()),
      DocumentStatus::Pending
    );
  }

  #[test]
  fn verified_tracks_resolved_status() {
    let profile = profile_rec("A", "approved");
    let verification = profile_rec("B", "uploaded");
    let doc = merge(Some(&profile), Some(&verification));
    assert_eq!(doc.status, DocumentStatus::Uploaded);
    assert!(!doc.verified);

    let doc = merge(Some(&profile), None);
    assert!(doc.verified);
  }

  #[test]
  fn reconcile_is_total() {
    let inputs = [
      (docs(json!({})), None),
      (docs(json!({})), Some(docs(json!({})))),
      (docs(json!({ "drivingLicense": { "url": "A" } })), None),
      (docs(json!({ "nonsense": 1 })), Some(docs(json!({ "rc_book": null })))),
    ];
    for (profile, verification) in inputs {
      let set = reconcile(&profile, verification.as_ref());
      assert_eq!(set.iter().count(), DocumentType::COUNT);
    }
  }

  #[test]
  fn license_scenario_verification_wins() {
    let profile = docs(json!({
      "drivingLicense": { "url": "A", "status": "uploaded" }
    }));
    let verification = docs(json!({
      "driving_license": { "downloadURL": "B", "verificationStatus": "approved" }
    }));
    let set = reconcile(&profile, Some(&verification));
    let license = set.get(DocumentType::DrivingLicense);
    assert_eq!(license.url, "B");
    assert_eq!(license.status, DocumentStatus::Approved);
    assert!(license.verified);
  }

  #[test]
  fn aadhaar_scenario_profile_url_survives() {
    let profile = docs(json!({ "aadhaar": { "url": "X", "status": "uploaded" } }));
    let verification = docs(json!({
      "aadhaar_card": { "downloadURL": "", "verificationStatus": "pending" }
    }));
    let set = reconcile(&profile, Some(&verification));
    assert_eq!(set.get(DocumentType::Aadhaar).url, "X");
  }

  #[test]
  fn types_are_merged_independently() {
    let profile = docs(json!({ "insurance": { "url": "I", "status": "approved" } }));
    let verification = docs(json!({
      "rc_book": { "downloadURL": "R", "verificationStatus": "rejected", "rejectionReason": "expired" }
    }));
    let set = reconcile(&profile, Some(&verification));
    assert_eq!(set.get(DocumentType::Insurance).status, DocumentStatus::Approved);
    let rc = set.get(DocumentType::RcBook);
    assert_eq!(rc.status, DocumentStatus::Rejected);
    assert_eq!(rc.rejection_reason.as_deref(), Some("expired"));
    assert_eq!(set.get(DocumentType::ProfilePhoto), &CanonicalDocument::missing());
  }

  #[test]
  fn reconciling_written_back_sources_is_a_fixed_point() {
    let profile = docs(json!({
      "drivingLicense": { "url": "A", "status": "uploaded" },
      "aadhaar": { "url": "X", "status": "approved" },
    }));
    let verification = docs(json!({
      "driving_license": { "downloadURL": "B", "verificationStatus": "rejected" },
      "aadhaar_card": { "downloadURL": "" },
    }));
    let set = reconcile(&profile, Some(&verification));

    let profile = profile.with_canonical(&set, SourceKind::Profile);
    let verification = verification.with_canonical(&set, SourceKind::Verification);
    assert_eq!(reconcile(&profile, Some(&verification)), set);
  }
}
