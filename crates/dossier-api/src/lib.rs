//! JSON REST API for Dossier.
//!
//! Exposes an axum [`Router`] backed by a [`VerificationEngine`] over any
//! [`dossier_core::store::DriverStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", dossier_api::api_router(engine.clone()))
//! ```

pub mod documents;
pub mod drivers;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use dossier_core::{engine::VerificationEngine, store::DriverStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<VerificationEngine<S>>) -> Router<()>
where
  S: DriverStore + 'static,
{
  Router::new()
    // Drivers
    .route("/drivers", get(drivers::list::<S>).post(drivers::create::<S>))
    .route("/drivers/{id}", get(drivers::get_one::<S>))
    .route(
      "/drivers/{id}/verification-requests",
      post(drivers::submit::<S>),
    )
    .route("/drivers/{id}/resync", post(drivers::resync_one::<S>))
    .route("/resync", post(drivers::resync_all::<S>))
    // Documents
    .route("/drivers/{id}/documents", get(documents::list::<S>))
    .route(
      "/drivers/{id}/documents/{doc_type}/decision",
      post(documents::decide::<S>),
    )
    .route(
      "/drivers/{id}/documents/{doc_type}/upload",
      post(documents::upload::<S>),
    )
    .with_state(engine)
}
