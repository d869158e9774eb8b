//! [`VerificationEngine`] — reconciliation, transitions and the aggregate sync
//! wired to a [`DriverStore`].
//!
//! Every mutation follows the same cycle: read both sources, reconcile,
//! apply the step, recompute the aggregate, persist under the version that
//! was read. A stale write or a timed-out persist restarts the cycle from a
//! fresh read, up to `max_attempts` times.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{self, DriverAggregateStatus},
  document::{CanonicalDocument, DocumentType, DriverDocumentSet, SourceDocuments},
  driver::DriverProfile,
  merge,
  store::{DriverStore, WriteOutcome},
  verification::{self, Decision, TransitionPolicy, Upload},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Engine tunables, deserialised from the `[engine]` table of the server
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Reconcile-and-persist attempts per operation before giving up.
  pub max_attempts:                  u32,
  pub persist_timeout_ms:            u64,
  pub allow_reupload_after_approval: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_attempts:                  3,
      persist_timeout_ms:            5_000,
      allow_reupload_after_approval: false,
    }
  }
}

impl EngineConfig {
  pub fn persist_timeout(&self) -> Duration {
    Duration::from_millis(self.persist_timeout_ms)
  }

  pub fn policy(&self) -> TransitionPolicy {
    TransitionPolicy {
      allow_reupload_after_approval: self.allow_reupload_after_approval,
    }
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Diagnostic view of one driver: the reconciled set next to what the store
/// last cached for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
  pub driver_id:        Uuid,
  pub version:          u64,
  pub documents:        DriverDocumentSet,
  pub aggregate:        DriverAggregateStatus,
  pub cached_aggregate: Option<DriverAggregateStatus>,
  /// Whether the cached aggregate matches the one recomputed now.
  pub in_sync:          bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedDriver {
  pub driver_id: Uuid,
  pub aggregate: DriverAggregateStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
  pub driver_id: Uuid,
  pub error:     String,
}

/// Outcome of [`VerificationEngine::resync_all`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
  pub synced: Vec<SyncedDriver>,
  pub failed: Vec<SyncFailure>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

struct Snapshot {
  version:   u64,
  documents: DriverDocumentSet,
}

/// Holds no per-driver state; one instance serves concurrent requests for
/// any number of drivers.
pub struct VerificationEngine<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S> Clone for VerificationEngine<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: self.config.clone(),
    }
  }
}

impl<S: DriverStore> VerificationEngine<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self { Self { store, config } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  // ── Reads ─────────────────────────────────────────────────────────────

  async fn snapshot(&self, driver_id: Uuid) -> Result<Snapshot> {
    let profile = self
      .store
      .get_profile(driver_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::DriverNotFound(driver_id))?;
    let request = self
      .store
      .get_latest_verification_request(driver_id)
      .await
      .map_err(store_err)?;

    let documents = merge::reconcile(
      &profile.documents,
      request.as_ref().map(|r| &r.documents),
    );
    Ok(Snapshot {
      version: profile.version,
      documents,
    })
  }

  /// The reconciled document set for `driver_id`. Read-only.
  pub async fn reconciled_documents(&self, driver_id: Uuid) -> Result<DriverDocumentSet> {
    Ok(self.snapshot(driver_id).await?.documents)
  }

  /// Reconcile and compare against the cached aggregate without writing.
  pub async fn inspect(&self, driver_id: Uuid) -> Result<Inspection> {
    let snapshot = self.snapshot(driver_id).await?;
    let cached_aggregate = self
      .store
      .get_cached_aggregate(driver_id)
      .await
      .map_err(store_err)?;
    let aggregate = aggregate::recompute(&snapshot.documents);

    Ok(Inspection {
      driver_id,
      version: snapshot.version,
      in_sync: cached_aggregate == Some(aggregate),
      documents: snapshot.documents,
      aggregate,
      cached_aggregate,
    })
  }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Apply an admin decision to one document and sync the aggregate.
  pub async fn decide(
    &self,
    driver_id: Uuid,
    doc_type: DocumentType,
    decision: Decision,
  ) -> Result<CanonicalDocument> {
    let (set, _) = self
      .mutate(driver_id, |set| {
        let next = verification::apply_decision(set.get(doc_type), &decision)?;
        Ok(set.with(doc_type, next))
      })
      .await?;
    info!(%driver_id, %doc_type, status = %set.get(doc_type).status, "decision applied");
    Ok(set.get(doc_type).clone())
  }

  /// Record a new submission for one document and sync the aggregate.
  pub async fn record_upload(
    &self,
    driver_id: Uuid,
    doc_type: DocumentType,
    upload: Upload,
  ) -> Result<CanonicalDocument> {
    let policy = self.config.policy();
    let (set, _) = self
      .mutate(driver_id, |set| {
        let next = verification::apply_upload(set.get(doc_type), &upload, policy)?;
        Ok(set.with(doc_type, next))
      })
      .await?;
    info!(%driver_id, %doc_type, "upload recorded");
    Ok(set.get(doc_type).clone())
  }

  /// Recompute and persist the aggregate from a fresh reconciliation.
  pub async fn resync(&self, driver_id: Uuid) -> Result<DriverAggregateStatus> {
    let (set, aggregate) = self.mutate(driver_id, |set| Ok(set.clone())).await?;
    debug!(%driver_id, overall = %aggregate::label(&set), "driver resynced");
    Ok(aggregate)
  }

  /// Resync every driver in the store, collecting failures instead of
  /// stopping at the first one.
  pub async fn resync_all(&self) -> Result<SyncReport> {
    let drivers = self.store.list_drivers().await.map_err(store_err)?;
    let mut report = SyncReport::default();

    for driver_id in drivers {
      match self.resync(driver_id).await {
        Ok(aggregate) => report.synced.push(SyncedDriver {
          driver_id,
          aggregate,
        }),
        Err(e) => {
          warn!(%driver_id, error = %e, "resync failed");
          report.failed.push(SyncFailure {
            driver_id,
            error: e.to_string(),
          });
        }
      }
    }

    info!(
      synced = report.synced.len(),
      failed = report.failed.len(),
      "fleet resync finished"
    );
    Ok(report)
  }

  // ── Ingest ────────────────────────────────────────────────────────────

  /// Create a driver from profile-source documents and persist its
  /// reconciled state.
  pub async fn register_driver(&self, documents: SourceDocuments) -> Result<Inspection> {
    let DriverProfile { driver_id, .. } =
      self.store.add_driver(documents).await.map_err(store_err)?;
    self.resync(driver_id).await?;
    self.inspect(driver_id).await
  }

  /// Append a verification request; it becomes the verification source.
  ///
  /// A request that would reopen an approved document is refused under the
  /// same policy as [`Self::record_upload`], and nothing is appended.
  pub async fn submit_verification_request(
    &self,
    driver_id: Uuid,
    documents: SourceDocuments,
  ) -> Result<Inspection> {
    let profile = self
      .store
      .get_profile(driver_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::DriverNotFound(driver_id))?;
    let latest = self
      .store
      .get_latest_verification_request(driver_id)
      .await
      .map_err(store_err)?;

    let current = merge::reconcile(
      &profile.documents,
      latest.as_ref().map(|r| &r.documents),
    );
    let candidate = merge::reconcile(&profile.documents, Some(&documents));
    verification::admit_submission(&current, &candidate, self.config.policy()).map_err(
      |(doc_type, e)| {
        warn!(%driver_id, %doc_type, "verification request would reopen an approved document");
        e
      },
    )?;

    self
      .store
      .append_verification_request(driver_id, documents)
      .await
      .map_err(store_err)?;
    self.resync(driver_id).await?;
    self.inspect(driver_id).await
  }

  // ── Sync cycle ────────────────────────────────────────────────────────

  async fn mutate<F>(
    &self,
    driver_id: Uuid,
    step: F,
  ) -> Result<(DriverDocumentSet, DriverAggregateStatus)>
  where
    F: Fn(&DriverDocumentSet) -> Result<DriverDocumentSet>,
  {
    let max_attempts = self.config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
      attempt += 1;
      let snapshot = self.snapshot(driver_id).await?;
      let next = step(&snapshot.documents)?;
      let aggregate = aggregate::recompute(&next);

      match self.persist(driver_id, &next, &aggregate, snapshot.version).await {
        Ok(version) => {
          debug!(%driver_id, version, attempt, "canonical state persisted");
          return Ok((next, aggregate));
        }
        Err(e) if e.is_retryable() && attempt < max_attempts => {
          warn!(%driver_id, attempt, error = %e, "persist failed, re-reconciling");
        }
        Err(e) if e.is_retryable() => {
          return Err(Error::RetriesExhausted {
            driver_id,
            attempts: attempt,
            last: Box::new(e),
            last_known: Box::new(snapshot.documents),
          });
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn persist(
    &self,
    driver_id: Uuid,
    set: &DriverDocumentSet,
    aggregate: &DriverAggregateStatus,
    expected: u64,
  ) -> Result<u64> {
    let timeout = self.config.persist_timeout();
    let outcome = tokio::time::timeout(
      timeout,
      self
        .store
        .write_canonical_state(driver_id, set, aggregate, expected),
    )
    .await
    .map_err(|_| Error::PersistTimeout(timeout))?
    .map_err(store_err)?;

    match outcome {
      WriteOutcome::Written { version } => Ok(version),
      WriteOutcome::Stale { actual } => Err(Error::StaleWrite {
        driver_id,
        expected,
        actual,
      }),
      WriteOutcome::Missing => Err(Error::DriverNotFound(driver_id)),
    }
  }
}

fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}
