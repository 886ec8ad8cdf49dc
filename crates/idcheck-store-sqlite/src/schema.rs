//! SQL schema for the verification store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Participant directory. Contacts compare case-insensitively.
CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    contact     TEXT NOT NULL COLLATE NOCASE UNIQUE,
    created_at  TEXT NOT NULL
);

-- One row per subject. A resubmission after rejection overwrites the row.
CREATE TABLE IF NOT EXISTS requests (
    request_id        TEXT PRIMARY KEY,
    subject_id        TEXT NOT NULL UNIQUE,
    scheme            TEXT,            -- 'online' | 'offline'; NULL on legacy rows
    personal_data     TEXT NOT NULL,   -- JSON, tagged by field schema
    document_type     TEXT NOT NULL,
    document_number   TEXT NOT NULL,
    attachment_ref    TEXT,
    state             TEXT NOT NULL
                      CHECK (state IN ('pending', 'granted', 'rejected')),
    rejection_reason  TEXT,
    unique_id         TEXT,            -- fingerprint, set on grant
    submitted_at      TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    decided_at        TEXT,
    decided_by        TEXT
);

-- At most one granted record per fingerprint.
CREATE UNIQUE INDEX IF NOT EXISTS requests_granted_unique_id_idx
    ON requests(unique_id) WHERE state = 'granted';

CREATE INDEX IF NOT EXISTS requests_state_idx ON requests(state, submitted_at);

-- Append-only audit trail of administrator decisions.
CREATE TABLE IF NOT EXISTS decisions (
    decision_id  TEXT PRIMARY KEY,
    request_id   TEXT NOT NULL REFERENCES requests(request_id),
    admin_id     TEXT NOT NULL,
    kind         TEXT NOT NULL,        -- 'granted' | 'rejected'
    reason       TEXT,
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS decisions_request_idx ON decisions(request_id);

PRAGMA user_version = 1;
";
