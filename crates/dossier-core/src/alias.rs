//! The alias table: how each source names each document type.
//!
//! The profile writer keys documents camelCase, the verification-request
//! writer snake_case. Supporting a new [`DocumentType`] means adding its row
//! here and nothing else.

use strum::EnumCount;

use crate::document::{DocumentType, SourceKind};

/// One row of the alias table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
  pub document_type:    DocumentType,
  pub profile_key:      &'static str,
  pub verification_key: &'static str,
}

impl Alias {
  pub fn key(&self, source: SourceKind) -> &'static str {
    match source {
      SourceKind::Profile => self.profile_key,
      SourceKind::Verification => self.verification_key,
    }
  }
}

/// Indexed by [`DocumentType`] declaration order.
pub const ALIASES: [Alias; DocumentType::COUNT] = [
  Alias {
    document_type:    DocumentType::DrivingLicense,
    profile_key:      "drivingLicense",
    verification_key: "driving_license",
  },
  Alias {
    document_type:    DocumentType::Aadhaar,
    profile_key:      "aadhaar",
    verification_key: "aadhaar_card",
  },
  Alias {
    document_type:    DocumentType::Insurance,
    profile_key:      "insurance",
    verification_key: "insurance",
  },
  Alias {
    document_type:    DocumentType::RcBook,
    profile_key:      "rcBook",
    verification_key: "rc_book",
  },
  Alias {
    document_type:    DocumentType::ProfilePhoto,
    profile_key:      "profilePhoto",
    verification_key: "profile_photo",
  },
];

pub fn alias(doc_type: DocumentType) -> &'static Alias {
  &ALIASES[doc_type.index()]
}

/// The key `source` stores `doc_type` under.
pub fn source_key(doc_type: DocumentType, source: SourceKind) -> &'static str {
  alias(doc_type).key(source)
}

/// Resolve a key within one source's convention.
pub fn lookup(source: SourceKind, key: &str) -> Option<DocumentType> {
  ALIASES
    .iter()
    .find(|a| a.key(source) == key)
    .map(|a| a.document_type)
}

/// Resolve a key written under either convention.
pub fn canonical_key_for(source_key: &str) -> Option<DocumentType> {
  lookup(SourceKind::Profile, source_key)
    .or_else(|| lookup(SourceKind::Verification, source_key))
}
