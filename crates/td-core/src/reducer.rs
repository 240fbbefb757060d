//! The reducer capability and the partial state it folds into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Result, event::ActivityEvent};

// ─── PartialAggregate ────────────────────────────────────────────────────────

/// State accumulated by folding a prefix of a stream.
///
/// `fields` mirrors the persisted columns of the document type (camelCase
/// names). A key is present only if some folded event wrote it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialAggregate {
  pub fields:    Map<String, Value>,
  /// Set once the stream's `*Created` event has been folded.
  pub initiated: bool,
}

impl PartialAggregate {
  pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

  pub fn contains(&self, field: &str) -> bool { self.fields.contains_key(field) }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() && !self.initiated }

  /// Fold the initiating event of a stream.
  pub fn initiate(self, event: &ActivityEvent, nested: &[&str]) -> Result<Self> {
    let mut state = self.merge_event(event, nested)?;
    state.initiated = true;
    Ok(state)
  }

  /// Apply the event's payload with last-write-wins semantics per field.
  ///
  /// Fields listed in `nested` hold objects whose keys are merged one by one
  /// instead of replacing the whole object.
  pub fn merge_event(mut self, event: &ActivityEvent, nested: &[&str]) -> Result<Self> {
    for (key, value) in event.payload()? {
      if nested.contains(&key.as_str())
        && let Value::Object(incoming) = value
        && let Some(Value::Object(current)) = self.fields.get_mut(key)
      {
        for (k, v) in incoming {
          current.insert(k.clone(), v.clone());
        }
        continue;
      }
      self.fields.insert(key.clone(), value.clone());
    }
    Ok(self)
  }

  /// Soft deletion: the row is kept and flagged.
  pub fn mark_deleted(mut self) -> Self {
    self.fields.insert("isDeleted".to_owned(), Value::Bool(true));
    self
  }
}

// ─── Reducer ─────────────────────────────────────────────────────────────────

/// Folds one event into the accumulated state of a document type.
///
/// Implementations must be pure: no I/O, and identical event sequences always
/// yield identical states. Events whose tag is not handled are returned
/// unchanged.
pub trait Reducer {
  fn reduce(
    &self,
    state: PartialAggregate,
    event: &ActivityEvent,
  ) -> Result<PartialAggregate>;
}
