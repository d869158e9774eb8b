//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Source documents are stored
//! as compact JSON objects. UUIDs are stored as hyphenated lowercase strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dossier_core::{
  aggregate::{DriverAggregateStatus, OverallStatus},
  document::{DocumentStatus, DocumentType, DriverDocumentSet, SourceDocuments},
  driver::{DriverProfile, VerificationRequest},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Source documents ─────────────────────────────────────────────────────────

pub fn encode_documents(docs: &SourceDocuments) -> String { docs.to_value().to_string() }

/// Unparseable JSON decodes to an empty mapping, which reconciles to every
/// document `pending`.
pub fn decode_documents(s: &str) -> SourceDocuments {
  serde_json::from_str::<serde_json::Value>(s)
    .map(SourceDocuments::from_value)
    .unwrap_or_default()
}

// ─── Listing mirror ───────────────────────────────────────────────────────────

pub fn encode_document_statuses(set: &DriverDocumentSet) -> String {
  let statuses: serde_json::Map<String, serde_json::Value> = set
    .iter()
    .map(|(doc_type, doc)| (doc_type.to_string(), doc.status.to_string().into()))
    .collect();
  serde_json::Value::Object(statuses).to_string()
}

pub fn decode_overall(s: &str) -> Result<OverallStatus> {
  Ok(serde_json::from_value(serde_json::Value::from(s))?)
}

/// The denormalised copy of a driver's verification state used by listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverListing {
  pub driver_id:           Uuid,
  pub verification_status: OverallStatus,
  pub document_statuses:   BTreeMap<DocumentType, DocumentStatus>,
  pub updated_at:          DateTime<Utc>,
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `drivers` row.
pub struct RawProfile {
  pub driver_id:         String,
  pub created_at:        String,
  pub profile_documents: String,
  pub state_version:     i64,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<DriverProfile> {
    Ok(DriverProfile {
      driver_id:  decode_uuid(&self.driver_id)?,
      created_at: decode_dt(&self.created_at)?,
      documents:  decode_documents(&self.profile_documents),
      version:    self.state_version as u64,
    })
  }
}

/// Raw strings read directly from a `verification_requests` row.
pub struct RawRequest {
  pub request_id:   String,
  pub driver_id:    String,
  pub submitted_at: String,
  pub documents:    String,
}

impl RawRequest {
  pub fn into_request(self) -> Result<VerificationRequest> {
    Ok(VerificationRequest {
      request_id:   decode_uuid(&self.request_id)?,
      driver_id:    decode_uuid(&self.driver_id)?,
      submitted_at: decode_dt(&self.submitted_at)?,
      documents:    decode_documents(&self.documents),
    })
  }
}

/// Raw values read directly from an `aggregate_cache` row.
pub struct RawAggregate {
  pub all_approved:  bool,
  pub any_rejected:  bool,
  pub pending_count: i64,
}

impl RawAggregate {
  pub fn into_aggregate(self) -> DriverAggregateStatus {
    DriverAggregateStatus {
      all_approved:  self.all_approved,
      any_rejected:  self.any_rejected,
      pending_count: self.pending_count as usize,
    }
  }
}

/// Raw strings read directly from a `driver_listings` row.
pub struct RawListing {
  pub driver_id:           String,
  pub verification_status: String,
  pub document_statuses:   String,
  pub updated_at:          String,
}

impl RawListing {
  pub fn into_listing(self) -> Result<DriverListing> {
    Ok(DriverListing {
      driver_id:           decode_uuid(&self.driver_id)?,
      verification_status: decode_overall(&self.verification_status)?,
      document_statuses:   serde_json::from_str(&self.document_statuses)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}
