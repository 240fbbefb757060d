//! Error types for `td-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{bsd::BsdType, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("stream id must not be empty")]
  EmptyStreamId,

  /// The backing store could not be reached or failed mid-query.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A stored record exists but could not be decoded. Retrying will not help.
  #[error("corrupt record: {0}")]
  CorruptRecord(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The completeness check rejected the folded state.
  #[error("aggregate is incomplete after folding {events} event(s)")]
  IncompleteAggregate { events: usize },

  /// A recognised event carried a payload its reducer cannot apply. This is a
  /// contract violation on the write path, not a runtime condition.
  #[error("malformed event #{seq} ({event_type}): {reason}")]
  MalformedEvent {
    seq:        i64,
    event_type: String,
    reason:     String,
  },

  #[error("{bsd_type} {id} not found")]
  DocumentNotFound { bsd_type: BsdType, id: String },

  #[error("revision request not found: {0}")]
  RevisionRequestNotFound(Uuid),

  #[error("unknown document type: {0:?}")]
  UnknownBsdType(String),

  #[error("cannot apply {signature} signature to a bsvhu in status {from}")]
  InvalidTransition { from: String, signature: String },
}

impl Error {
  /// Box a backend error, as [`Error::CorruptRecord`] when the backend
  /// reports a decoding failure and [`Error::StoreUnavailable`] otherwise.
  pub fn store<E: StoreError>(err: E) -> Self {
    if err.is_corrupt_record() {
      Self::CorruptRecord(Box::new(err))
    } else {
      Self::StoreUnavailable(Box::new(err))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
