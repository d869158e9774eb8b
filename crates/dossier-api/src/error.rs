//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use dossier_core::document::DriverDocumentSet;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The store kept rejecting or timing out; the operator gets the last
  /// reconciled state to re-inspect.
  #[error("unavailable: {message}")]
  Unavailable {
    message:    String,
    last_known: Option<Box<DriverDocumentSet>>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<dossier_core::Error> for ApiError {
  fn from(e: dossier_core::Error) -> Self {
    use dossier_core::Error as E;

    let message = e.to_string();
    match e {
      E::DriverNotFound(_) => ApiError::NotFound(message),
      E::UnknownDocumentType(_) | E::MissingReason | E::MissingUrl => {
        ApiError::BadRequest(message)
      }
      E::InvalidTransition { .. } => ApiError::Conflict(message),
      // The engine wraps these in `RetriesExhausted`; bare ones only come
      // from code that writes through a store without its retry loop.
      E::StaleWrite { .. } | E::PersistTimeout(_) => ApiError::Unavailable {
        message,
        last_known: None,
      },
      E::RetriesExhausted { last_known, .. } => ApiError::Unavailable {
        message,
        last_known: Some(last_known),
      },
      E::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::Unavailable {
        message,
        last_known,
      } => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": message, "lastKnown": last_known }),
      ),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
