//! Error type for `td-store-sqlite`.

use td_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] td_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A JSON column held something other than an object.
  #[error("column {0} does not hold a JSON object")]
  NotAnObject(&'static str),
}

impl StoreError for Error {
  fn is_corrupt_record(&self) -> bool {
    matches!(
      self,
      Self::Core(_) | Self::Json(_) | Self::Uuid(_) | Self::DateParse(_) | Self::NotAnObject(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
