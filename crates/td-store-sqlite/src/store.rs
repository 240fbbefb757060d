//! The SQLite implementation of the `td-core` store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use td_core::{
  bsd::{BsdType, Document},
  event::{ActivityEvent, NewActivityEvent, StreamId},
  revision::{NewRevisionRequest, RevisionRequest},
  snapshot::Snapshot,
  store::{DocumentStore, EventStore, PendingQuery, PendingRevision, RevisionStore},
};

use crate::{
  encode::{
    REVISION_COLUMNS, RawDocument, RawEvent, RawRevisionRequest, SNAPSHOT_FOR_TYPE,
    encode_bsd_type, encode_dt, encode_metadata, encode_object, encode_snapshot,
    encode_uuid, snapshot_column, truncate_dt,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An activity-event store backed by a single SQLite file.
///
/// Clones share one connection.
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

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Run raw SQL against the database, bypassing every encoder.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
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
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = Error;

  async fn append(&self, input: NewActivityEvent) -> Result<ActivityEvent> {
    let created_at = truncate_dt(input.occurred_at.unwrap_or_else(Utc::now));

    let stream_id_str = input.stream_id.as_str().to_owned();
    let event_type    = input.event_type.clone();
    let actor         = input.actor.clone();
    let data_json     = serde_json::to_string(&input.data)?;
    let metadata_json = input.metadata.as_ref().map(encode_metadata).transpose()?;
    let at_str        = encode_dt(created_at);

    let seq = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (stream_id, event_type, actor, data_json, metadata_json, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![stream_id_str, event_type, actor, data_json, metadata_json, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ActivityEvent {
      seq,
      stream_id: input.stream_id,
      event_type: input.event_type,
      actor: input.actor,
      data: input.data,
      metadata: input.metadata,
      created_at,
    })
  }

  async fn get_events(
    &self,
    stream_id:    &StreamId,
    at_or_before: Option<DateTime<Utc>>,
  ) -> Result<Vec<ActivityEvent>> {
    let stream_id_str = stream_id.as_str().to_owned();
    let cutoff_str    = at_or_before.map(encode_dt);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT seq, stream_id, event_type, actor, data_json, metadata_json, created_at
           FROM events
           WHERE stream_id = ?1
             AND (?2 IS NULL OR created_at <= ?2)
           ORDER BY created_at ASC, seq ASC",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![stream_id_str, cutoff_str], |row| {
            Ok(RawEvent {
              seq:           row.get(0)?,
              stream_id:     row.get(1)?,
              event_type:    row.get(2)?,
              actor:         row.get(3)?,
              data_json:     row.get(4)?,
              metadata_json: row.get(5)?,
              created_at:    row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn get_document(&self, bsd_type: BsdType, id: &str) -> Result<Option<Document>> {
    let type_str = encode_bsd_type(bsd_type).to_owned();
    let id_str   = id.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT bsd_type, bsd_id, row_json, updated_at
             FROM documents WHERE bsd_type = ?1 AND bsd_id = ?2",
            rusqlite::params![type_str, id_str],
            |row| {
              Ok(RawDocument {
                bsd_type:   row.get(0)?,
                bsd_id:     row.get(1)?,
                row_json:   row.get(2)?,
                updated_at: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn put_document(&self, document: Document) -> Result<()> {
    let type_str = encode_bsd_type(document.bsd_type).to_owned();
    let row_json = encode_object(&document.fields)?;
    let at_str   = encode_dt(document.updated_at);
    let id_str   = document.id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (bsd_type, bsd_id, row_json, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (bsd_type, bsd_id)
           DO UPDATE SET row_json = excluded.row_json, updated_at = excluded.updated_at",
          rusqlite::params![type_str, id_str, row_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RevisionStore impl ──────────────────────────────────────────────────────

impl RevisionStore for SqliteStore {
  type Error = Error;

  async fn create_revision_request(&self, input: NewRevisionRequest) -> Result<RevisionRequest> {
    let request = RevisionRequest {
      id:                      Uuid::new_v4(),
      bsd_type:                input.bsd_type,
      bsd_id:                  input.bsd_id,
      authoring_company_siret: input.authoring_company_siret,
      comment:                 input.comment,
      content:                 input.content,
      created_at:              truncate_dt(Utc::now()),
      snapshot:                None,
    };

    let id_str       = encode_uuid(request.id);
    let type_str     = encode_bsd_type(request.bsd_type).to_owned();
    let bsd_id       = request.bsd_id.clone();
    let siret        = request.authoring_company_siret.clone();
    let comment      = request.comment.clone();
    let content_json = encode_object(&request.content)?;
    let at_str       = encode_dt(request.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO revision_requests (
             revision_id, bsd_type, bsd_id, authoring_company_siret,
             comment, content_json, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, type_str, bsd_id, siret, comment, content_json, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(request)
  }

  async fn get_revision_request(&self, id: Uuid) -> Result<Option<RevisionRequest>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {REVISION_COLUMNS}, {SNAPSHOT_FOR_TYPE}
       FROM revision_requests WHERE revision_id = ?1"
    );

    let raw: Option<RawRevisionRequest> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], RawRevisionRequest::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawRevisionRequest::into_revision_request).transpose()
  }

  async fn list_without_snapshot(&self, query: &PendingQuery) -> Result<Vec<PendingRevision>> {
    let type_str  = query.bsd_type.map(encode_bsd_type).map(str::to_owned);
    let after_str = query.after.clone();
    let limit_val = query.limit as i64;
    let sql = format!(
      "SELECT {REVISION_COLUMNS}, {SNAPSHOT_FOR_TYPE}
       FROM revision_requests
       WHERE ({SNAPSHOT_FOR_TYPE}) IS NULL
         AND (?1 IS NULL OR bsd_type = ?1)
         AND (?2 IS NULL OR revision_id > ?2)
       ORDER BY revision_id ASC
       LIMIT ?3"
    );

    // Rows are read one by one so a single bad row cannot sink the page.
    let raws: Vec<(String, rusqlite::Result<RawRevisionRequest>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![type_str, after_str, limit_val], |row| {
            Ok((row.get(0)?, RawRevisionRequest::from_row(row)))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raws
        .into_iter()
        .map(|(key, raw)| {
          let decoded = raw
            .map_err(|e| e.to_string())
            .and_then(|raw| raw.into_revision_request().map_err(|e| e.to_string()));
          match decoded {
            Ok(request) => PendingRevision::Ready(request),
            Err(reason) => PendingRevision::Unreadable { key, reason },
          }
        })
        .collect(),
    )
  }

  async fn set_snapshot_if_absent(&self, id: Uuid, snapshot: &Snapshot) -> Result<bool> {
    let id_str        = encode_uuid(id);
    let type_str      = encode_bsd_type(snapshot.bsd_type).to_owned();
    let snapshot_json = encode_snapshot(snapshot)?;
    let column        = snapshot_column(snapshot.bsd_type);
    let sql = format!(
      "UPDATE revision_requests SET {column} = ?1
       WHERE revision_id = ?2 AND bsd_type = ?3 AND {column} IS NULL"
    );

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params![snapshot_json, id_str, type_str])?)
      })
      .await?;

    Ok(changed == 1)
  }
}
