//! Document types (bordereaux) whose history can be replayed.
//!
//! Each sub-module holds one type's reducer, completeness check and snapshot
//! field tables. Dispatch happens on [`BsdType`] at the call site.

pub mod bsda;
pub mod bsdasri;
pub mod bsdd;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Result,
  aggregate::{CompletenessCheck, aggregate_stream},
  event::{ActivityEvent, EventKind},
  reducer::PartialAggregate,
  snapshot::HistoryField,
};

pub use bsda::BsdaReducer;
pub use bsdasri::BsdasriReducer;
pub use bsdd::BsddReducer;

// ─── BsdType ─────────────────────────────────────────────────────────────────

/// The document types covered by history replay.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum BsdType {
  Bsda,
  Bsdd,
  Bsdasri,
}

impl BsdType {
  /// Prefix of every event tag written for this type.
  pub fn event_prefix(self) -> &'static str {
    match self {
      Self::Bsda => "Bsda",
      Self::Bsdd => "Bsdd",
      Self::Bsdasri => "Bsdasri",
    }
  }

  /// The stored tag for `kind`, e.g. `BsddSigned`.
  pub fn event_tag(self, kind: EventKind) -> String {
    let kind: &'static str = kind.into();
    format!("{}{kind}", self.event_prefix())
  }

  pub fn completeness_check(self) -> CompletenessCheck {
    match self {
      Self::Bsda => bsda::is_complete,
      Self::Bsdd => bsdd::is_complete,
      Self::Bsdasri => bsdasri::is_complete,
    }
  }

  /// Fold a stream with this type's reducer, always gated by its
  /// completeness check.
  pub fn fold(self, events: &[ActivityEvent]) -> Result<PartialAggregate> {
    let check = Some(self.completeness_check());
    match self {
      Self::Bsda => aggregate_stream(events, &BsdaReducer, check),
      Self::Bsdd => aggregate_stream(events, &BsddReducer, check),
      Self::Bsdasri => aggregate_stream(events, &BsdasriReducer, check),
    }
  }

  /// Fields that may legitimately change between creation and a revision
  /// request, keyed by their `initial*` snapshot name.
  pub fn history_fields(self) -> &'static [HistoryField] {
    match self {
      Self::Bsda => bsda::HISTORY_FIELDS,
      Self::Bsdd => bsdd::HISTORY_FIELDS,
      Self::Bsdasri => bsdasri::HISTORY_FIELDS,
    }
  }

  /// Identifiers and relations not tracked by the event log; always read
  /// from the live row.
  pub fn structural_fields(self) -> &'static [&'static str] {
    match self {
      Self::Bsda => bsda::STRUCTURAL_FIELDS,
      Self::Bsdd => bsdd::STRUCTURAL_FIELDS,
      Self::Bsdasri => bsdasri::STRUCTURAL_FIELDS,
    }
  }
}

/// Shared completeness rule: the stream starts with its creation event.
/// Any field may still be missing, the merger fills it from the live row.
pub(crate) fn was_created(state: &PartialAggregate) -> bool { state.initiated }

// ─── Document ────────────────────────────────────────────────────────────────

/// The live persisted row of a document, as read from the primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub bsd_type:   BsdType,
  pub id:         String,
  /// Column values keyed by camelCase column name.
  pub fields:     Map<String, Value>,
  pub updated_at: DateTime<Utc>,
}

impl Document {
  pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }
}
