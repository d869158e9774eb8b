//! [`SqliteStore`] — the SQLite implementation of [`DriverStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use dossier_core::{
  aggregate::{self, DriverAggregateStatus},
  document::{DriverDocumentSet, SourceDocuments, SourceKind},
  driver::{DriverProfile, VerificationRequest},
  store::{DriverStore, WriteOutcome},
};

use crate::{
  encode::{
    decode_documents, encode_document_statuses, encode_documents, encode_dt,
    encode_uuid, DriverListing, RawAggregate, RawListing, RawProfile, RawRequest,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Dossier driver store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The listing mirror for a driver, if it has been written.
  pub async fn get_listing(&self, driver_id: Uuid) -> Result<Option<DriverListing>> {
    let id_str = encode_uuid(driver_id);

    let raw: Option<RawListing> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT driver_id, verification_status, document_statuses, updated_at
             FROM driver_listings WHERE driver_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawListing {
                driver_id:           row.get(0)?,
                verification_status: row.get(1)?,
                document_statuses:   row.get(2)?,
                updated_at:          row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawListing::into_listing).transpose()
  }

  /// Every verification request for a driver, oldest first.
  pub async fn list_verification_requests(
    &self,
    driver_id: Uuid,
  ) -> Result<Vec<VerificationRequest>> {
    let id_str = encode_uuid(driver_id);

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT request_id, driver_id, submitted_at, documents
           FROM verification_requests
           WHERE driver_id = ?1
           ORDER BY request_seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_request)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }
}

fn raw_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
  Ok(RawRequest {
    request_id:   row.get(0)?,
    driver_id:    row.get(1)?,
    submitted_at: row.get(2)?,
    documents:    row.get(3)?,
  })
}

// ─── DriverStore impl ────────────────────────────────────────────────────────

impl DriverStore for SqliteStore {
  type Error = Error;

  // ── Ingest ────────────────────────────────────────────────────────────────

  async fn add_driver(&self, documents: SourceDocuments) -> Result<DriverProfile> {
    let profile = DriverProfile {
      driver_id: Uuid::new_v4(),
      created_at: Utc::now(),
      documents,
      version: 0,
    };

    let id_str   = encode_uuid(profile.driver_id);
    let at_str   = encode_dt(profile.created_at);
    let docs_str = encode_documents(&profile.documents);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO drivers (driver_id, created_at, profile_documents, state_version)
           VALUES (?1, ?2, ?3, 0)",
          rusqlite::params![id_str, at_str, docs_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn append_verification_request(
    &self,
    driver_id: Uuid,
    documents: SourceDocuments,
  ) -> Result<VerificationRequest> {
    let request = VerificationRequest {
      request_id: Uuid::new_v4(),
      driver_id,
      submitted_at: Utc::now(),
      documents,
    };

    let req_id_str    = encode_uuid(request.request_id);
    let driver_id_str = encode_uuid(driver_id);
    let at_str        = encode_dt(request.submitted_at);
    let docs_str      = encode_documents(&request.documents);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM drivers WHERE driver_id = ?1",
            rusqlite::params![driver_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO verification_requests (request_id, driver_id, submitted_at, documents)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![req_id_str, driver_id_str, at_str, docs_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DriverNotFound(driver_id));
    }
    Ok(request)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_drivers(&self) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT driver_id FROM drivers ORDER BY rowid")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids
      .iter()
      .map(|s| Uuid::parse_str(s).map_err(Error::Uuid))
      .collect()
  }

  async fn get_profile(&self, driver_id: Uuid) -> Result<Option<DriverProfile>> {
    let id_str = encode_uuid(driver_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT driver_id, created_at, profile_documents, state_version
             FROM drivers WHERE driver_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawProfile {
                driver_id:         row.get(0)?,
                created_at:        row.get(1)?,
                profile_documents: row.get(2)?,
                state_version:     row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_latest_verification_request(
    &self,
    driver_id: Uuid,
  ) -> Result<Option<VerificationRequest>> {
    let id_str = encode_uuid(driver_id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT request_id, driver_id, submitted_at, documents
             FROM verification_requests
             WHERE driver_id = ?1
             ORDER BY request_seq DESC
             LIMIT 1",
            rusqlite::params![id_str],
            raw_request,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn get_cached_aggregate(
    &self,
    driver_id: Uuid,
  ) -> Result<Option<DriverAggregateStatus>> {
    let id_str = encode_uuid(driver_id);

    let raw: Option<RawAggregate> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT all_approved, any_rejected, pending_count
             FROM aggregate_cache WHERE driver_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawAggregate {
                all_approved:  row.get(0)?,
                any_rejected:  row.get(1)?,
                pending_count: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawAggregate::into_aggregate))
  }

  // ── Canonical write-back ──────────────────────────────────────────────────

  async fn write_canonical_state(
    &self,
    driver_id:        Uuid,
    set:              &DriverDocumentSet,
    aggregate:        &DriverAggregateStatus,
    expected_version: u64,
  ) -> Result<WriteOutcome> {
    let id_str       = encode_uuid(driver_id);
    let now_str      = encode_dt(Utc::now());
    let overall_str  = aggregate::label(set).to_string();
    let statuses_str = encode_document_statuses(set);
    let aggregate    = *aggregate;
    let set          = set.clone();

    // Every location is rewritten inside one transaction; any early return
    // drops it uncommitted.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<(i64, String)> = tx
          .query_row(
            "SELECT state_version, profile_documents FROM drivers WHERE driver_id = ?1",
            rusqlite::params![id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let Some((version, profile_json)) = current else {
          return Ok(WriteOutcome::Missing);
        };
        if version as u64 != expected_version {
          return Ok(WriteOutcome::Stale {
            actual: version as u64,
          });
        }
        let next_version = version + 1;

        let profile_docs =
          decode_documents(&profile_json).with_canonical(&set, SourceKind::Profile);
        tx.execute(
          "UPDATE drivers SET profile_documents = ?2, state_version = ?3
           WHERE driver_id = ?1",
          rusqlite::params![id_str, encode_documents(&profile_docs), next_version],
        )?;

        let latest: Option<(i64, String)> = tx
          .query_row(
            "SELECT request_seq, documents FROM verification_requests
             WHERE driver_id = ?1
             ORDER BY request_seq DESC
             LIMIT 1",
            rusqlite::params![id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        if let Some((seq, request_json)) = latest {
          let request_docs = decode_documents(&request_json)
            .with_canonical(&set, SourceKind::Verification);
          tx.execute(
            "UPDATE verification_requests SET documents = ?2 WHERE request_seq = ?1",
            rusqlite::params![seq, encode_documents(&request_docs)],
          )?;
        }

        tx.execute(
          "INSERT INTO driver_listings
             (driver_id, verification_status, document_statuses, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (driver_id) DO UPDATE SET
             verification_status = excluded.verification_status,
             document_statuses   = excluded.document_statuses,
             updated_at          = excluded.updated_at",
          rusqlite::params![id_str, overall_str, statuses_str, now_str],
        )?;

        tx.execute(
          "INSERT INTO aggregate_cache
             (driver_id, all_approved, any_rejected, pending_count, state_version, computed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (driver_id) DO UPDATE SET
             all_approved  = excluded.all_approved,
             any_rejected  = excluded.any_rejected,
             pending_count = excluded.pending_count,
             state_version = excluded.state_version,
             computed_at   = excluded.computed_at",
          rusqlite::params![
            id_str,
            aggregate.all_approved,
            aggregate.any_rejected,
            aggregate.pending_count as i64,
            next_version,
            now_str,
          ],
        )?;

        tx.commit()?;
        Ok(WriteOutcome::Written {
          version: next_version as u64,
        })
      })
      .await?;

    Ok(outcome)
  }
}
