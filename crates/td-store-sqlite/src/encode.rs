//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with a fixed microsecond
//! width, so lexical order in SQL matches chronological order. Payloads and
//! snapshots are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use serde_json::{Map, Value};
use td_core::{
  bsd::{BsdType, Document},
  event::{ActivityEvent, EventMetadata, StreamId},
  revision::RevisionRequest,
  snapshot::Snapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The precision timestamps survive a round trip with.
pub fn truncate_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── BsdType ─────────────────────────────────────────────────────────────────

pub fn encode_bsd_type(t: BsdType) -> &'static str {
  match t {
    BsdType::Bsda => "BSDA",
    BsdType::Bsdd => "BSDD",
    BsdType::Bsdasri => "BSDASRI",
  }
}

pub fn decode_bsd_type(s: &str) -> Result<BsdType> {
  s.parse()
    .map_err(|_| td_core::Error::UnknownBsdType(s.to_owned()).into())
}

/// The revision-request column holding snapshots of `t`.
pub fn snapshot_column(t: BsdType) -> &'static str {
  match t {
    BsdType::Bsda => "bsda_snapshot",
    BsdType::Bsdd => "bsdd_snapshot",
    BsdType::Bsdasri => "bsdasri_snapshot",
  }
}

/// SQL expression selecting the snapshot column matching each row's type.
pub const SNAPSHOT_FOR_TYPE: &str = "CASE bsd_type
       WHEN 'BSDA' THEN bsda_snapshot
       WHEN 'BSDD' THEN bsdd_snapshot
       WHEN 'BSDASRI' THEN bsdasri_snapshot
     END";

// ─── JSON ────────────────────────────────────────────────────────────────────

pub fn encode_object(map: &Map<String, Value>) -> Result<String> {
  Ok(serde_json::to_string(map)?)
}

pub fn decode_object(s: &str, column: &'static str) -> Result<Map<String, Value>> {
  match serde_json::from_str(s)? {
    Value::Object(map) => Ok(map),
    _ => Err(Error::NotAnObject(column)),
  }
}

pub fn encode_metadata(m: &EventMetadata) -> Result<String> {
  Ok(serde_json::to_string(m)?)
}

pub fn decode_metadata(s: &str) -> Result<EventMetadata> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_snapshot(s: &Snapshot) -> Result<String> {
  Ok(serde_json::to_string(s)?)
}

pub fn decode_snapshot(s: &str) -> Result<Snapshot> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub seq:           i64,
  pub stream_id:     String,
  pub event_type:    String,
  pub actor:         String,
  pub data_json:     String,
  pub metadata_json: Option<String>,
  pub created_at:    String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<ActivityEvent> {
    Ok(ActivityEvent {
      seq:        self.seq,
      stream_id:  StreamId::new(self.stream_id)?,
      event_type: self.event_type,
      actor:      self.actor,
      data:       serde_json::from_str(&self.data_json)?,
      metadata:   self
        .metadata_json
        .as_deref()
        .map(decode_metadata)
        .transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub bsd_type:   String,
  pub bsd_id:     String,
  pub row_json:   String,
  pub updated_at: String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      bsd_type:   decode_bsd_type(&self.bsd_type)?,
      id:         self.bsd_id,
      fields:     decode_object(&self.row_json, "row_json")?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read from a `revision_requests` row, with the snapshot column
/// matching its type already selected.
pub struct RawRevisionRequest {
  pub revision_id:             String,
  pub bsd_type:                String,
  pub bsd_id:                  String,
  pub authoring_company_siret: String,
  pub comment:                 String,
  pub content_json:            String,
  pub created_at:              String,
  pub snapshot_json:           Option<String>,
}

/// Column list matching [`RawRevisionRequest::from_row`].
pub const REVISION_COLUMNS: &str = "revision_id, bsd_type, bsd_id,
       authoring_company_siret, comment, content_json, created_at";

impl RawRevisionRequest {
  /// Read a row selected as `REVISION_COLUMNS, SNAPSHOT_FOR_TYPE`.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      revision_id:             row.get(0)?,
      bsd_type:                row.get(1)?,
      bsd_id:                  row.get(2)?,
      authoring_company_siret: row.get(3)?,
      comment:                 row.get(4)?,
      content_json:            row.get(5)?,
      created_at:              row.get(6)?,
      snapshot_json:           row.get(7)?,
    })
  }

  pub fn into_revision_request(self) -> Result<RevisionRequest> {
    Ok(RevisionRequest {
      id:                      decode_uuid(&self.revision_id)?,
      bsd_type:                decode_bsd_type(&self.bsd_type)?,
      bsd_id:                  self.bsd_id,
      authoring_company_siret: self.authoring_company_siret,
      comment:                 self.comment,
      content:                 decode_object(&self.content_json, "content_json")?,
      created_at:              decode_dt(&self.created_at)?,
      snapshot:                self
        .snapshot_json
        .as_deref()
        .map(decode_snapshot)
        .transpose()?,
    })
  }
}
