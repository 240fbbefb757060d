//! Storage traits for events, live documents and revision requests.
//!
//! Implemented by storage backends (e.g. `td-store-sqlite`). The aggregation
//! pipeline and the backfill depend on these abstractions, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  bsd::{BsdType, Document},
  event::{ActivityEvent, NewActivityEvent, StreamId},
  revision::{NewRevisionRequest, RevisionRequest},
  snapshot::Snapshot,
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised by a storage backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// Whether a stored record failed to decode. Anything else is treated as
  /// the store being unavailable.
  fn is_corrupt_record(&self) -> bool { false }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// The append-only activity log.
///
/// Appends for one stream are serialised by the transaction of the write
/// that produces them; reads need no coordination since nothing already
/// appended ever changes.
pub trait EventStore: Send + Sync {
  type Error: StoreError;

  /// Append an event and return it with its `seq` and `created_at` set.
  fn append(
    &self,
    input: NewActivityEvent,
  ) -> impl Future<Output = Result<ActivityEvent, Self::Error>> + Send + '_;

  /// The events of `stream_id`, ascending by `(created_at, seq)`.
  ///
  /// - `at_or_before`: inclusive upper bound on `created_at`; the whole
  ///   stream when `None`.
  ///
  /// An unknown stream yields an empty vec, never an error.
  fn get_events<'a>(
    &'a self,
    stream_id: &'a StreamId,
    at_or_before: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<ActivityEvent>, Self::Error>> + Send + 'a;
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Read access to the live rows of the primary store.
pub trait DocumentStore: Send + Sync {
  type Error: StoreError;

  /// Retrieve a document by type and id. Returns `None` if not found.
  fn get_document<'a>(
    &'a self,
    bsd_type: BsdType,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Insert or replace a document's live row.
  fn put_document(
    &self,
    document: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Revision requests ───────────────────────────────────────────────────────

/// Parameters for [`RevisionStore::list_without_snapshot`].
#[derive(Debug, Clone, Default)]
pub struct PendingQuery {
  pub bsd_type: Option<BsdType>,
  /// Keyset cursor: only rows whose [`PendingRevision::key`] sorts strictly
  /// after this one.
  pub after:    Option<String>,
  pub limit:    usize,
}

/// One row returned by [`RevisionStore::list_without_snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRevision {
  Ready(RevisionRequest),
  /// A row the backend could not decode. It is reported, not dropped, so the
  /// cursor can move past it.
  Unreadable { key: String, reason: String },
}

impl PendingRevision {
  /// Keyset position of the row: the hyphenated lowercase id.
  pub fn key(&self) -> String {
    match self {
      Self::Ready(request) => request.id.hyphenated().to_string(),
      Self::Unreadable { key, .. } => key.clone(),
    }
  }
}

pub trait RevisionStore: Send + Sync {
  type Error: StoreError;

  /// Persist a new revision request without a snapshot. `id` and
  /// `created_at` are set by the store.
  fn create_revision_request(
    &self,
    input: NewRevisionRequest,
  ) -> impl Future<Output = Result<RevisionRequest, Self::Error>> + Send + '_;

  fn get_revision_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RevisionRequest>, Self::Error>> + Send + '_;

  /// Revision requests whose snapshot column is still null, ascending by
  /// key. A row that fails to decode is returned as
  /// [`PendingRevision::Unreadable`] instead of failing the page.
  fn list_without_snapshot<'a>(
    &'a self,
    query: &'a PendingQuery,
  ) -> impl Future<Output = Result<Vec<PendingRevision>, Self::Error>> + Send + 'a;

  /// Store `snapshot` on revision request `id` unless it already has one.
  ///
  /// Returns `true` if the snapshot was written, `false` if the request
  /// already carried a snapshot (or does not exist).
  fn set_snapshot_if_absent<'a>(
    &'a self,
    id: Uuid,
    snapshot: &'a Snapshot,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
