//! HTTP server wiring for Dossier.
//!
//! Mounts [`dossier_api::api_router`] under `/api` behind a request-tracing
//! layer. Configuration is layered from an optional TOML file and `DOSSIER_`
//! environment variables; see [`load_config`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use dossier_core::{
  engine::{EngineConfig, VerificationEngine},
  store::DriverStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub engine:     EngineConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("dossier.db"),
      engine:     EngineConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Layer `path` (if it exists) under `DOSSIER_*` variables.
///
/// Nested keys use a double underscore: `DOSSIER_ENGINE__MAX_ATTEMPTS=5`.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("DOSSIER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router for `engine`.
pub fn app<S>(engine: Arc<VerificationEngine<S>>) -> Router
where
  S: DriverStore + 'static,
{
  Router::new()
    .nest("/api", dossier_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}
