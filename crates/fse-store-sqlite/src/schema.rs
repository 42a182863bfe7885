//! SQL schema for the FSE SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    document    TEXT NOT NULL,   -- JSON-encoded Subject
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at  TEXT NOT NULL
);

-- One row per identifier value. The primary key is what stops two subjects
-- from claiming the same identifier.
CREATE TABLE IF NOT EXISTS subject_identifiers (
    value       TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    system      TEXT NOT NULL,
    scheme      TEXT NOT NULL
);

-- Observations are append-only.
CREATE TABLE IF NOT EXISTS observations (
    observation_id TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL REFERENCES subjects(subject_id),
    code           TEXT NOT NULL,   -- '' when the result was not coded
    issued_at      TEXT NOT NULL,
    document       TEXT NOT NULL,   -- JSON-encoded Observation
    recorded_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS observations_natural_key
    ON observations(subject_id, code, issued_at) WHERE code <> '';

CREATE INDEX IF NOT EXISTS identifiers_subject_idx
    ON subject_identifiers(subject_id);
CREATE INDEX IF NOT EXISTS observations_subject_idx
    ON observations(subject_id);

PRAGMA user_version = 1;
";
