//! SQL schema for the Trackdéchets SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- The activity log is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS events (
    seq           INTEGER PRIMARY KEY AUTOINCREMENT,  -- tie-break for equal timestamps
    stream_id     TEXT NOT NULL,    -- bordereau id
    event_type    TEXT NOT NULL,    -- e.g. 'BsdaCreated'
    actor         TEXT NOT NULL,
    data_json     TEXT NOT NULL,
    metadata_json TEXT,
    created_at    TEXT NOT NULL     -- RFC 3339 UTC, fixed microsecond width
);

-- Live rows of the primary store, one JSON object per document.
CREATE TABLE IF NOT EXISTS documents (
    bsd_type   TEXT NOT NULL,       -- 'BSDA' | 'BSDD' | 'BSDASRI'
    bsd_id     TEXT NOT NULL,
    row_json   TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (bsd_type, bsd_id)
);

-- One snapshot column per document type; only the one matching bsd_type is
-- ever filled, and never overwritten once set.
CREATE TABLE IF NOT EXISTS revision_requests (
    revision_id             TEXT PRIMARY KEY,
    bsd_type                TEXT NOT NULL,
    bsd_id                  TEXT NOT NULL,
    authoring_company_siret TEXT NOT NULL,
    comment                 TEXT NOT NULL DEFAULT '',
    content_json            TEXT NOT NULL DEFAULT '{}',
    created_at              TEXT NOT NULL,
    bsda_snapshot           TEXT,
    bsdd_snapshot           TEXT,
    bsdasri_snapshot        TEXT
);

CREATE INDEX IF NOT EXISTS events_stream_idx     ON events(stream_id, created_at, seq);
CREATE INDEX IF NOT EXISTS revisions_bsd_idx     ON revision_requests(bsd_type, bsd_id);

PRAGMA user_version = 1;
";
