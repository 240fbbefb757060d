//! Settings read from `backfill.toml` and `TD_*` environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use td_core::{
  backfill::{BackfillOptions, DEFAULT_BATCH_SIZE},
  bsd::BsdType,
};

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillConfig {
  /// SQLite file holding events, documents and revision requests.
  pub store_path: PathBuf,
  #[serde(default)]
  pub batch_size: Option<usize>,
}

impl BackfillConfig {
  /// Run options, with command-line values taking precedence over the file.
  pub fn options(
    &self,
    bsd_type: Option<BsdType>,
    batch_size: Option<usize>,
    dry_run: bool,
  ) -> BackfillOptions {
    BackfillOptions {
      bsd_type,
      batch_size: batch_size.or(self.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
      dry_run,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
