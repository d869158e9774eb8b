//! SQL schema for the Dossier SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The driver profile record and its profile-source documents.
CREATE TABLE IF NOT EXISTS drivers (
    driver_id          TEXT PRIMARY KEY,
    created_at         TEXT NOT NULL,
    profile_documents  TEXT NOT NULL DEFAULT '{}',  -- JSON, camelCase keys
    state_version      INTEGER NOT NULL DEFAULT 0
);

-- One row per submission; rows are never deleted. The canonical write-back
-- only rewrites the documents of the latest row.
CREATE TABLE IF NOT EXISTS verification_requests (
    request_seq   INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id    TEXT NOT NULL UNIQUE,
    driver_id     TEXT NOT NULL REFERENCES drivers(driver_id),
    submitted_at  TEXT NOT NULL,
    documents     TEXT NOT NULL DEFAULT '{}'        -- JSON, snake_case keys
);

-- Mirror read by driver-listing screens.
CREATE TABLE IF NOT EXISTS driver_listings (
    driver_id           TEXT PRIMARY KEY REFERENCES drivers(driver_id),
    verification_status TEXT NOT NULL,              -- 'verified' | 'rejected' | 'inReview' | 'incomplete'
    document_statuses   TEXT NOT NULL,              -- JSON {documentType: status}
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS aggregate_cache (
    driver_id      TEXT PRIMARY KEY REFERENCES drivers(driver_id),
    all_approved   INTEGER NOT NULL,
    any_rejected   INTEGER NOT NULL,
    pending_count  INTEGER NOT NULL,
    state_version  INTEGER NOT NULL,
    computed_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS verification_requests_driver_idx
    ON verification_requests(driver_id, request_seq);

PRAGMA user_version = 1;
";
