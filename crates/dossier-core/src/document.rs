//! Document types — the source records as the two writers store them and the
//! canonical record the engine derives from them.
//!
//! Source records are read leniently: a field of the wrong JSON type is
//! treated as absent so one malformed entry degrades to the `pending` default
//! instead of failing the whole reconciliation.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumCount};

use crate::alias;

/// Stored on a rejected document whose source carried no reason.
pub const UNSPECIFIED_REJECTION_REASON: &str = "no reason recorded";

// ─── Document type ───────────────────────────────────────────────────────────

/// The closed set of identity documents a driver submits.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumCount,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DocumentType {
  DrivingLicense,
  Aadhaar,
  Insurance,
  RcBook,
  ProfilePhoto,
}

impl DocumentType {
  /// Every document type, in declaration order.
  pub const ALL: [DocumentType; DocumentType::COUNT] = [
    DocumentType::DrivingLicense,
    DocumentType::Aadhaar,
    DocumentType::Insurance,
    DocumentType::RcBook,
    DocumentType::ProfilePhoto,
  ];

  pub(crate) fn index(self) -> usize { self as usize }
}

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Which of the two independently-written records a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  /// The document-state copy on the driver's own profile record.
  Profile,
  /// The document-state copy on the latest verification request.
  Verification,
}

impl SourceKind {
  /// Field holding the document URL in this source.
  pub fn url_field(self) -> &'static str {
    match self {
      Self::Profile => "url",
      Self::Verification => "downloadURL",
    }
  }

  /// Field holding the raw status string in this source.
  pub fn status_field(self) -> &'static str {
    match self {
      Self::Profile => "status",
      Self::Verification => "verificationStatus",
    }
  }

  fn other(self) -> Self {
    match self {
      Self::Profile => Self::Verification,
      Self::Verification => Self::Profile,
    }
  }
}

// ─── Source records ──────────────────────────────────────────────────────────

/// One source's entry for one document type, normalised to a single field
/// layout regardless of the naming convention it was stored under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocumentRecord {
  pub url:              Option<String>,
  /// Free-form status string exactly as the writer stored it.
  pub status:           Option<String>,
  pub filename:         Option<String>,
  pub uploaded_at:      Option<DateTime<Utc>>,
  pub verified:         Option<bool>,
  pub rejection_reason: Option<String>,
}

impl SourceDocumentRecord {
  /// Read a record from its raw JSON form.
  ///
  /// The source's own field names are preferred; the other convention's names
  /// are accepted as a fallback. A bare string is taken as a URL. Anything
  /// other than an object or a string yields `None`.
  pub fn from_value(value: &Value, source: SourceKind) -> Option<Self> {
    let obj = match value {
      Value::Object(obj) => obj,
      Value::String(url) => {
        return Some(Self {
          url: Some(url.clone()),
          ..Self::default()
        });
      }
      _ => return None,
    };

    let field = |name: fn(SourceKind) -> &'static str| {
      string_field(obj, name(source))
        .or_else(|| string_field(obj, name(source.other())))
    };

    Some(Self {
      url:              field(SourceKind::url_field),
      status:           field(SourceKind::status_field),
      filename:         string_field(obj, "filename"),
      uploaded_at:      obj.get("uploadedAt").and_then(parse_timestamp),
      verified:         obj.get("verified").and_then(Value::as_bool),
      rejection_reason: string_field(obj, "rejectionReason"),
    })
  }

  /// Whether the record carries a non-blank URL.
  pub fn has_url(&self) -> bool {
    self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
  }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
  obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Accepts RFC 3339 strings, epoch milliseconds, and the document store's
/// `{seconds, nanoseconds}` object (with or without leading underscores).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
  match value {
    Value::String(s) => DateTime::parse_from_rfc3339(s)
      .ok()
      .map(|dt| dt.with_timezone(&Utc)),
    Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
    Value::Object(obj) => {
      let secs = obj
        .get("seconds")
        .or_else(|| obj.get("_seconds"))
        .and_then(Value::as_i64)?;
      let nanos = obj
        .get("nanoseconds")
        .or_else(|| obj.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
      Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
    }
    _ => None,
  }
}

/// The raw `sourceKey -> record` mapping held by one source.
///
/// Keys outside the alias table are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceDocuments(Map<String, Value>);

impl SourceDocuments {
  pub fn new() -> Self { Self::default() }

  /// Wrap a raw JSON value; anything but an object becomes an empty mapping.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::Object(map) => Self(map),
      _ => Self::default(),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn to_value(&self) -> Value { Value::Object(self.0.clone()) }

  /// The record stored under `doc_type`'s alias for `source`, if readable.
  pub fn record(
    &self,
    doc_type: DocumentType,
    source: SourceKind,
  ) -> Option<SourceDocumentRecord> {
    self
      .get(alias::source_key(doc_type, source))
      .and_then(|v| SourceDocumentRecord::from_value(v, source))
  }

  /// Write every canonical document back under `source`'s naming convention.
  ///
  /// Fields the engine does not own are preserved on existing entries.
  pub fn with_canonical(
    mut self,
    set: &DriverDocumentSet,
    source: SourceKind,
  ) -> Self {
    for (doc_type, doc) in set.iter() {
      let key = alias::source_key(doc_type, source);
      let mut entry = match self.0.remove(key) {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
      };
      doc.write_fields(&mut entry, source);
      self.0.insert(key.to_owned(), Value::Object(entry));
    }
    self
  }
}

// ─── Canonical document ──────────────────────────────────────────────────────

/// Verification status of a canonical document.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
  Pending,
  Uploaded,
  Approved,
  Rejected,
}

/// The reconciled, authoritative view of one document type for one driver.
///
/// `verified` holds exactly when `status` is `Approved`; `rejection_reason`
/// is present exactly when `status` is `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
  /// Empty when nothing has been submitted; never null.
  pub url:              String,
  pub status:           DocumentStatus,
  pub filename:         Option<String>,
  pub uploaded_at:      Option<DateTime<Utc>>,
  pub verified:         bool,
  pub rejection_reason: Option<String>,
}

impl CanonicalDocument {
  /// The value for a document neither source knows about.
  pub fn missing() -> Self {
    Self {
      url:              String::new(),
      status:           DocumentStatus::Pending,
      filename:         None,
      uploaded_at:      None,
      verified:         false,
      rejection_reason: None,
    }
  }

  pub fn has_url(&self) -> bool { !self.url.is_empty() }

  /// Re-derive `verified` and `rejection_reason` from `status`.
  pub(crate) fn settled(mut self) -> Self {
    self.verified = self.status == DocumentStatus::Approved;
    self.rejection_reason = match self.status {
      DocumentStatus::Rejected => Some(
        self
          .rejection_reason
          .filter(|r| !r.trim().is_empty())
          .unwrap_or_else(|| UNSPECIFIED_REJECTION_REASON.to_owned()),
      ),
      _ => None,
    };
    self
  }

  fn write_fields(&self, entry: &mut Map<String, Value>, source: SourceKind) {
    entry.insert(source.url_field().to_owned(), Value::from(self.url.clone()));
    entry.insert(
      source.status_field().to_owned(),
      Value::from(self.status.to_string()),
    );
    entry.insert("verified".to_owned(), Value::from(self.verified));
    set_or_remove(entry, "filename", self.filename.clone().map(Value::from));
    set_or_remove(
      entry,
      "uploadedAt",
      self.uploaded_at.map(|at| Value::from(at.to_rfc3339())),
    );
    set_or_remove(
      entry,
      "rejectionReason",
      self.rejection_reason.clone().map(Value::from),
    );
  }
}

fn set_or_remove(entry: &mut Map<String, Value>, key: &str, value: Option<Value>) {
  match value {
    Some(v) => {
      entry.insert(key.to_owned(), v);
    }
    None => {
      entry.remove(key);
    }
  }
}

// ─── Document set ────────────────────────────────────────────────────────────

/// Exactly one [`CanonicalDocument`] per [`DocumentType`].
///
/// Serialised as a JSON object keyed by the camelCase document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDocumentSet {
  documents: [CanonicalDocument; DocumentType::COUNT],
}

impl DriverDocumentSet {
  pub fn from_fn(mut f: impl FnMut(DocumentType) -> CanonicalDocument) -> Self {
    Self {
      documents: std::array::from_fn(|i| f(DocumentType::ALL[i])),
    }
  }

  pub fn get(&self, doc_type: DocumentType) -> &CanonicalDocument {
    &self.documents[doc_type.index()]
  }

  /// A copy of this set with `doc_type` replaced by `doc`.
  pub fn with(&self, doc_type: DocumentType, doc: CanonicalDocument) -> Self {
    let mut next = self.clone();
    next.documents[doc_type.index()] = doc;
    next
  }

  pub fn iter(&self) -> impl Iterator<Item = (DocumentType, &CanonicalDocument)> {
    DocumentType::ALL.into_iter().zip(self.documents.iter())
  }
}

impl Default for DriverDocumentSet {
  fn default() -> Self { Self::from_fn(|_| CanonicalDocument::missing()) }
}

impl Serialize for DriverDocumentSet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(DocumentType::COUNT))?;
    for (doc_type, doc) in self.iter() {
      map.serialize_entry(&doc_type, doc)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for DriverDocumentSet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let mut entries =
      BTreeMap::<DocumentType, CanonicalDocument>::deserialize(deserializer)?;
    Ok(Self::from_fn(|doc_type| {
      entries
        .remove(&doc_type)
        .unwrap_or_else(CanonicalDocument::missing)
    }))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn verification_record_reads_its_own_field_names() {
    let raw = json!({
      "downloadURL": "https://files/b.pdf",
      "verificationStatus": "approved",
      "filename": "b.pdf",
    });
    let rec = SourceDocumentRecord::from_value(&raw, SourceKind::Verification)
      .unwrap();
    assert_eq!(rec.url.as_deref(), Some("https://files/b.pdf"));
    assert_eq!(rec.status.as_deref(), Some("approved"));
    assert_eq!(rec.filename.as_deref(), Some("b.pdf"));
  }

  #[test]
  fn wrong_typed_fields_are_treated_as_absent() {
    let raw = json!({ "url": 42, "status": ["x"], "verified": "yes" });
    let rec = SourceDocumentRecord::from_value(&raw, SourceKind::Profile).unwrap();
    assert_eq!(rec, SourceDocumentRecord::default());
    assert!(SourceDocumentRecord::from_value(&json!(7), SourceKind::Profile).is_none());
  }

  #[test]
  fn timestamps_in_every_stored_shape() {
    let expected = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    assert_eq!(parse_timestamp(&json!("2023-11-14T22:13:20Z")), Some(expected));
    assert_eq!(parse_timestamp(&json!(1_700_000_000_000_i64)), Some(expected));
    assert_eq!(
      parse_timestamp(&json!({ "_seconds": 1_700_000_000, "_nanoseconds": 0 })),
      Some(expected)
    );
    assert_eq!(parse_timestamp(&json!("yesterday")), None);
  }

  #[test]
  fn settled_enforces_status_invariants() {
    let mut doc = CanonicalDocument::missing();
    doc.status = DocumentStatus::Rejected;
    doc.verified = true;
    let doc = doc.settled();
    assert!(!doc.verified);
    assert_eq!(doc.rejection_reason.as_deref(), Some(UNSPECIFIED_REJECTION_REASON));

    let mut doc = doc;
    doc.status = DocumentStatus::Approved;
    let doc = doc.settled();
    assert!(doc.verified);
    assert!(doc.rejection_reason.is_none());
  }

  #[test]
  fn with_canonical_preserves_unowned_fields_and_keys() {
    let docs = SourceDocuments::from_value(json!({
      "drivingLicense": { "url": "old", "sizeBytes": 1024 },
      "legacyNote": "keep me",
    }));
    let mut license = CanonicalDocument::missing();
    license.url = "new".into();
    license.status = DocumentStatus::Uploaded;
    let set = DriverDocumentSet::default()
      .with(DocumentType::DrivingLicense, license.settled());

    let written = docs.with_canonical(&set, SourceKind::Profile).to_value();
    assert_eq!(written["drivingLicense"]["url"], "new");
    assert_eq!(written["drivingLicense"]["status"], "uploaded");
    assert_eq!(written["drivingLicense"]["sizeBytes"], 1024);
    assert_eq!(written["legacyNote"], "keep me");
    assert_eq!(written["rcBook"]["status"], "pending");
  }

  #[test]
  fn document_set_serialises_as_camel_case_map() {
    let value = serde_json::to_value(DriverDocumentSet::default()).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), DocumentType::COUNT);
    assert_eq!(obj["rcBook"]["url"], "");
    assert_eq!(obj["profilePhoto"]["status"], "pending");

    let back: DriverDocumentSet = serde_json::from_value(json!({})).unwrap();
    assert_eq!(back, DriverDocumentSet::default());
  }
}
