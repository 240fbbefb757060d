//! Activity events: the append-only log behind every bordereau.
//!
//! An event is an immutable fact about one document (its stream). Events are
//! never updated or deleted once appended; the historical state of a document
//! is rebuilt by folding its stream through a [`crate::reducer::Reducer`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{Error, Result, bsd::BsdType};

// ─── Stream identifier ───────────────────────────────────────────────────────

/// Identifier of the document an event belongs to. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamId(String);

impl StreamId {
  pub fn new(id: impl Into<String>) -> Result<Self> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(Error::EmptyStreamId);
    }
    Ok(Self(id))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for StreamId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<StreamId> for String {
  fn from(id: StreamId) -> Self { id.0 }
}

impl AsRef<str> for StreamId {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for StreamId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Event kinds ─────────────────────────────────────────────────────────────

/// The lifecycle step an event records. Combined with a document type's
/// prefix it forms the stored tag, e.g. `BsdaCreated`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum EventKind {
  Created,
  Updated,
  Signed,
  RevisionRequestApplied,
  Deleted,
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Auxiliary context recorded alongside an event. Reducers never read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auth_type:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correlation_id: Option<String>,
  /// Anything else the write path chose to log (request ip, user agent...).
  #[serde(flatten)]
  pub extra:          Map<String, Value>,
}

// ─── ActivityEvent ───────────────────────────────────────────────────────────

/// One immutable fact about a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
  /// Store-assigned, strictly increasing across the whole log. Breaks ties
  /// between events sharing a `created_at`.
  pub seq:        i64,
  pub stream_id:  StreamId,
  #[serde(rename = "type")]
  pub event_type: String,
  pub actor:      String,
  pub data:       Value,
  pub metadata:   Option<EventMetadata>,
  pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
  /// The changed fields carried by this event.
  ///
  /// Write paths nest them under `data.content`; signature events and
  /// hand-built events may put them directly in `data`. `content` wins when
  /// present.
  pub fn payload(&self) -> Result<&Map<String, Value>> {
    let Value::Object(data) = &self.data else {
      return Err(self.malformed("data is not a JSON object"));
    };
    match data.get("content") {
      None => Ok(data),
      Some(Value::Object(content)) => Ok(content),
      Some(_) => Err(self.malformed("`content` is not a JSON object")),
    }
  }

  pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
    Error::MalformedEvent {
      seq:        self.seq,
      event_type: self.event_type.clone(),
      reason:     reason.into(),
    }
  }
}

// ─── NewActivityEvent ────────────────────────────────────────────────────────

/// Input to [`crate::store::EventStore::append`].
///
/// `seq` is always assigned by the store. `occurred_at` is normally left
/// unset so the store stamps the append time; it is only provided when
/// importing an existing log.
#[derive(Debug, Clone)]
pub struct NewActivityEvent {
  pub stream_id:   StreamId,
  pub event_type:  String,
  pub actor:       String,
  pub data:        Value,
  pub metadata:    Option<EventMetadata>,
  pub occurred_at: Option<DateTime<Utc>>,
}

impl NewActivityEvent {
  pub fn new(
    stream_id: StreamId,
    event_type: impl Into<String>,
    actor: impl Into<String>,
    data: Value,
  ) -> Self {
    Self {
      stream_id,
      event_type: event_type.into(),
      actor: actor.into(),
      data,
      metadata: None,
      occurred_at: None,
    }
  }

  /// A correctly-tagged event for `bsd_type` carrying `content`.
  pub fn for_document(
    bsd_type: BsdType,
    kind: EventKind,
    stream_id: StreamId,
    actor: impl Into<String>,
    content: Map<String, Value>,
  ) -> Self {
    Self::new(
      stream_id,
      bsd_type.event_tag(kind),
      actor,
      json!({ "content": content }),
    )
  }

  pub fn created(
    bsd_type: BsdType,
    stream_id: StreamId,
    actor: impl Into<String>,
    content: Map<String, Value>,
  ) -> Self {
    Self::for_document(bsd_type, EventKind::Created, stream_id, actor, content)
  }

  pub fn updated(
    bsd_type: BsdType,
    stream_id: StreamId,
    actor: impl Into<String>,
    content: Map<String, Value>,
  ) -> Self {
    Self::for_document(bsd_type, EventKind::Updated, stream_id, actor, content)
  }

  pub fn signed(
    bsd_type: BsdType,
    stream_id: StreamId,
    actor: impl Into<String>,
    content: Map<String, Value>,
  ) -> Self {
    Self::for_document(bsd_type, EventKind::Signed, stream_id, actor, content)
  }

  /// Recorded when an approved revision request is written onto the
  /// document.
  pub fn revision_applied(
    bsd_type: BsdType,
    stream_id: StreamId,
    actor: impl Into<String>,
    revision_request_id: Uuid,
    content: Map<String, Value>,
  ) -> Self {
    Self::new(
      stream_id,
      bsd_type.event_tag(EventKind::RevisionRequestApplied),
      actor,
      json!({
        "content": content,
        "revisionRequestId": revision_request_id,
      }),
    )
  }

  pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
    self.metadata = Some(metadata);
    self
  }

  pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
    self.occurred_at = Some(at);
    self
  }
}
