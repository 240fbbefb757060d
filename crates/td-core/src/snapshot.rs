//! Point-in-time snapshots attached to revision requests.
//!
//! A snapshot overlays the state replayed from a document's events (as of the
//! revision's creation) onto the live row. Fields the event log does not
//! know about fall back to the live value, so the merge itself never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  bsd::{BsdType, Document},
  event::StreamId,
  reducer::PartialAggregate,
  store::{DocumentStore, EventStore},
};

// ─── Field tables ────────────────────────────────────────────────────────────

/// Where a historically-significant value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
  /// A top-level column.
  Column(&'static str),
  /// The first non-null of several columns.
  Coalesce(&'static [&'static str]),
  /// A key inside an object-valued column (`forwardedIn.recipientCap`).
  Nested(&'static str, &'static str),
}

/// One `initial*` entry of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryField {
  pub key:    &'static str,
  pub source: FieldSource,
}

impl HistoryField {
  pub const fn column(key: &'static str, column: &'static str) -> Self {
    Self { key, source: FieldSource::Column(column) }
  }

  pub const fn coalesce(key: &'static str, columns: &'static [&'static str]) -> Self {
    Self { key, source: FieldSource::Coalesce(columns) }
  }

  pub const fn nested(
    key: &'static str,
    column: &'static str,
    nested_key: &'static str,
  ) -> Self {
    Self { key, source: FieldSource::Nested(column, nested_key) }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Whether the historical values came from replaying events or only from the
/// live row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotOrigin {
  Replayed,
  /// History could not be reconstructed; every field is the live value.
  CurrentRow,
}

/// A frozen record of a document's historically-significant fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub bsd_type: BsdType,
  pub bsd_id:   String,
  /// The cutoff events were replayed up to (inclusive).
  pub as_of:    DateTime<Utc>,
  pub origin:   SnapshotOrigin,
  /// `initial*` values plus structural fields under their own names.
  pub fields:   Map<String, Value>,
}

impl Snapshot {
  pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Combine a replayed aggregate with the live row.
///
/// For each history field the aggregate's entry wins when present (a
/// recorded `null` counts as present); otherwise the live value is used, and
/// `null` when neither has it. Structural fields always come from the live
/// row.
pub fn merge_snapshot(
  current: &Document,
  aggregate: &PartialAggregate,
  as_of: DateTime<Utc>,
  origin: SnapshotOrigin,
) -> Snapshot {
  let bsd_type = current.bsd_type;
  let mut fields = Map::new();

  for field in bsd_type.history_fields() {
    let value = match field.source {
      FieldSource::Column(column) => historical(current, aggregate, column),
      FieldSource::Coalesce(columns) => columns
        .iter()
        .map(|column| historical(current, aggregate, column))
        .find(|value| !value.is_null())
        .unwrap_or(Value::Null),
      FieldSource::Nested(column, key) => {
        historical_nested(current, aggregate, column, key)
      }
    };
    fields.insert(field.key.to_owned(), value);
  }

  for &column in bsd_type.structural_fields() {
    let value = current.get(column).cloned().unwrap_or(Value::Null);
    fields.insert(column.to_owned(), value);
  }

  Snapshot {
    bsd_type,
    bsd_id: current.id.clone(),
    as_of,
    origin,
    fields,
  }
}

fn historical(current: &Document, aggregate: &PartialAggregate, column: &str) -> Value {
  aggregate
    .get(column)
    .or_else(|| current.get(column))
    .cloned()
    .unwrap_or(Value::Null)
}

fn historical_nested(
  current: &Document,
  aggregate: &PartialAggregate,
  column: &str,
  key: &str,
) -> Value {
  let lookup = |parent: Option<&Value>| parent.and_then(|v| v.get(key)).cloned();
  lookup(aggregate.get(column))
    .or_else(|| lookup(current.get(column)))
    .unwrap_or(Value::Null)
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Rebuild the snapshot of a document as it stood at `as_of`.
///
/// Store failures are returned as [`Error::StoreUnavailable`] and a missing
/// row as [`Error::DocumentNotFound`]. A stream that cannot be replayed
/// (incomplete or malformed) degrades to a [`SnapshotOrigin::CurrentRow`]
/// snapshot instead of failing.
pub async fn compute_snapshot<S>(
  store: &S,
  bsd_type: BsdType,
  bsd_id: &str,
  as_of: DateTime<Utc>,
) -> Result<Snapshot>
where
  S: EventStore + DocumentStore,
{
  let stream_id = StreamId::new(bsd_id)?;

  let events = store
    .get_events(&stream_id, Some(as_of))
    .await
    .map_err(Error::store)?;

  let current = store
    .get_document(bsd_type, bsd_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::DocumentNotFound { bsd_type, id: bsd_id.to_owned() })?;

  let (aggregate, origin) = match bsd_type.fold(&events) {
    Ok(aggregate) => (aggregate, SnapshotOrigin::Replayed),
    Err(err @ Error::IncompleteAggregate { .. }) => {
      tracing::warn!(
        %bsd_type,
        bsd_id,
        %err,
        "history incomplete, snapshot uses current values"
      );
      (PartialAggregate::default(), SnapshotOrigin::CurrentRow)
    }
    Err(err @ Error::MalformedEvent { .. }) => {
      tracing::error!(
        %bsd_type,
        bsd_id,
        %err,
        "malformed event in stream, snapshot uses current values"
      );
      (PartialAggregate::default(), SnapshotOrigin::CurrentRow)
    }
    Err(err) => return Err(err),
  };

  tracing::debug!(
    %bsd_type,
    bsd_id,
    events = events.len(),
    ?origin,
    "computed snapshot"
  );
  Ok(merge_snapshot(&current, &aggregate, as_of, origin))
}
