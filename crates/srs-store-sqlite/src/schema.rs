//! SQL schema for the source-record SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id             TEXT PRIMARY KEY,
    status                  TEXT NOT NULL,
    processing_started_date TEXT
);

-- Rows are never deleted outside the administrative reset; deletion is a
-- state transition.
CREATE TABLE IF NOT EXISTS records (
    id                 TEXT PRIMARY KEY,
    matched_id         TEXT NOT NULL,
    snapshot_id        TEXT NOT NULL REFERENCES snapshots(snapshot_id),
    record_type        TEXT NOT NULL,   -- 'MARC' | 'EDIFACT'
    state              TEXT NOT NULL,   -- 'ACTUAL' | 'OLD' | 'DELETED' | 'DRAFT'
    \"order\"            INTEGER,
    suppress_discovery INTEGER NOT NULL DEFAULT 0,
    instance_id        TEXT,
    instance_hrid      TEXT,
    created_date       TEXT NOT NULL,   -- RFC 3339, microsecond precision
    created_by_user_id TEXT NOT NULL,
    updated_date       TEXT NOT NULL,
    updated_by_user_id TEXT NOT NULL
);

-- At most one ACTUAL version per logical record.
CREATE UNIQUE INDEX IF NOT EXISTS records_one_actual_idx
    ON records(matched_id) WHERE state = 'ACTUAL';

CREATE INDEX IF NOT EXISTS records_snapshot_idx ON records(snapshot_id);
CREATE INDEX IF NOT EXISTS records_matched_idx  ON records(matched_id);

-- Immutable once written.
CREATE TABLE IF NOT EXISTS raw_records (
    id        TEXT PRIMARY KEY,
    record_id TEXT NOT NULL UNIQUE REFERENCES records(id),
    content   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parsed_records (
    id        TEXT PRIMARY KEY,
    record_id TEXT NOT NULL UNIQUE REFERENCES records(id),
    content   TEXT NOT NULL          -- JSON document
);

CREATE TABLE IF NOT EXISTS error_records (
    id          TEXT PRIMARY KEY,
    record_id   TEXT NOT NULL UNIQUE REFERENCES records(id),
    content     TEXT NOT NULL,
    description TEXT NOT NULL
);

PRAGMA user_version = 1;
";

/// Shared `FROM` clause for every record read: the record row plus its
/// owned artifacts.
pub const RECORD_FROM: &str = "
FROM records r
JOIN raw_records raw     ON raw.record_id = r.id
LEFT JOIN parsed_records p ON p.record_id = r.id
LEFT JOIN error_records  e ON e.record_id = r.id
";

/// Column list matching [`crate::encode::RecordRow::from_row`].
pub const RECORD_COLUMNS: &str = "
SELECT r.id, r.matched_id, r.snapshot_id, r.record_type, r.state, r.\"order\",
       r.suppress_discovery, r.instance_id, r.instance_hrid,
       r.created_date, r.created_by_user_id, r.updated_date, r.updated_by_user_id,
       raw.id, raw.content,
       p.id, p.content,
       e.id, e.content, e.description
";
