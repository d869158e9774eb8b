//! Handlers for driver-level endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/drivers` | All driver ids |
//! | `POST` | `/drivers` | Body: `{"documents":{...}}` profile-source; returns 201 |
//! | `GET`  | `/drivers/:id` | [`Inspection`]: reconciled vs. cached aggregate |
//! | `POST` | `/drivers/:id/verification-requests` | Body: `{"documents":{...}}`; returns 201 |
//! | `POST` | `/drivers/:id/resync` | Recompute and persist the aggregate |
//! | `POST` | `/resync` | Resync every driver |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use dossier_core::{
  aggregate::DriverAggregateStatus,
  document::SourceDocuments,
  engine::{Inspection, SyncReport, VerificationEngine},
  store::DriverStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Body of `POST /drivers` and `POST /drivers/:id/verification-requests`.
#[derive(Debug, Deserialize)]
pub struct DocumentsBody {
  #[serde(default)]
  pub documents: SourceDocuments,
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /drivers`
pub async fn list<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
) -> Result<Json<Vec<Uuid>>, ApiError>
where
  S: DriverStore,
{
  let ids = engine
    .store()
    .list_drivers()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(ids))
}

// ─── Register ─────────────────────────────────────────────────────────────────

/// `POST /drivers` — returns 201 + the driver's first [`Inspection`].
pub async fn create<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Json(body): Json<DocumentsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DriverStore,
{
  let inspection = engine.register_driver(body.documents).await?;
  Ok((StatusCode::CREATED, Json(inspection)))
}

// ─── Inspect ──────────────────────────────────────────────────────────────────

/// `GET /drivers/:id`
pub async fn get_one<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path(driver_id): Path<Uuid>,
) -> Result<Json<Inspection>, ApiError>
where
  S: DriverStore,
{
  Ok(Json(engine.inspect(driver_id).await?))
}

// ─── Verification requests ────────────────────────────────────────────────────

/// `POST /drivers/:id/verification-requests`
pub async fn submit<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path(driver_id): Path<Uuid>,
  Json(body): Json<DocumentsBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DriverStore,
{
  let inspection = engine
    .submit_verification_request(driver_id, body.documents)
    .await?;
  Ok((StatusCode::CREATED, Json(inspection)))
}

// ─── Resync ───────────────────────────────────────────────────────────────────

/// `POST /drivers/:id/resync`
pub async fn resync_one<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
  Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverAggregateStatus>, ApiError>
where
  S: DriverStore,
{
  Ok(Json(engine.resync(driver_id).await?))
}

/// `POST /resync`
pub async fn resync_all<S>(
  State(engine): State<Arc<VerificationEngine<S>>>,
) -> Result<Json<SyncReport>, ApiError>
where
  S: DriverStore,
{
  Ok(Json(engine.resync_all().await?))
}
