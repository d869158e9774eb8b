//! Handlers for per-document endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/drivers/:id/documents` | Reconciled set; read-only |
//! | `POST` | `/drivers/:id/documents/:type/decision` | Body: [`Decision`] |
//! | `POST` | `/drivers/:id/documents/:type/upload` | Body: [`UploadBody`] |
//!
//! `:type` accepts the canonical name (`drivingLicense`) or either source
//! alias (`driving_license`).

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use dossier_core::{
  alias,
  document::{CanonicalDocument, DocumentType, DriverDocumentSet},
  engine::VerificationEngine,
  store::DriverStore,
  verification::{Decision, Upload},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

pub(crate) fn parse_document_type(raw: &str) -> Result<DocumentType, ApiError> {
  alias::canonical_key_for(raw)
    .ok_or_else(|| dossier_core::Error::UnknownDocumentType(raw.to_owned()).into())
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /drivers/:id/documents`
pub async fn list<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverDocumentSet>, ApiError>
where
  S: DriverStore,
{
  Ok(Json(engine.reconciled_documents(driver_id).await?))
}

// ─── Decide ───────────────────────────────────────────────────────────────────

/// `POST /drivers/:id/documents/:type/decision` — body:
/// `{"decision":"approve"}` or `{"decision":"reject","reason":"..."}`.
pub async fn decide<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path((driver_id, doc_type)): Path<(Uuid, String)>,
  Json(decision): Json<Decision>,
) -> Result<Json<CanonicalDocument>, ApiError>
where
  S: DriverStore,
{
  let doc_type = parse_document_type(&doc_type)?;
  Ok(Json(engine.decide(driver_id, doc_type, decision).await?))
}

// ─── Upload ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /drivers/:id/documents/:type/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub url:      String,
  pub filename: Option<String>,
}

/// `POST /drivers/:id/documents/:type/upload` — records where a new file was
/// stored; the file itself never passes through this API.
pub async fn upload<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path((driver_id, doc_type)): Path<(Uuid, String)>,
  Json(body): Json<UploadBody>,
) -> Result<Json<CanonicalDocument>, ApiError>
where
  S: DriverStore,
{
  let doc_type = parse_document_type(&doc_type)?;
  let upload = Upload {
    url:         body.url,
    filename:    body.filename,
    uploaded_at: Utc::now(),
  };
  Ok(Json(engine.record_upload(driver_id, doc_type, upload).await?))
}
