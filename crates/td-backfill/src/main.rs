//! td-backfill binary.
//!
//! Attaches snapshots to revision requests created before snapshots were
//! computed at creation time. Reads `backfill.toml` (or the path given with
//! `--config`); any setting can be overridden with a `TD_` environment
//! variable, e.g. `TD_STORE_PATH`.
//!
//! ```sh
//! cargo run -p td-backfill -- --bsd-type bsda --dry-run
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use td_core::{
  backfill::{backfill_revision_request, backfill_snapshots},
  bsd::BsdType,
  revision::SnapshotFill,
};
use td_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::{BackfillConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Backfill revision request snapshots")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "backfill.toml")]
  config: PathBuf,

  /// Only process revision requests on this document type.
  #[arg(long)]
  bsd_type: Option<BsdType>,

  /// Requests fetched per page.
  #[arg(long)]
  batch_size: Option<usize>,

  /// Count pending requests without writing anything.
  #[arg(long)]
  dry_run: bool,

  /// Backfill this single revision request and exit.
  #[arg(long, conflicts_with_all = ["bsd_type", "batch_size", "dry_run"])]
  revision_request: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let sources = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("TD"))
    .build()
    .context("failed to read config file")?;

  let backfill_cfg: BackfillConfig = sources
    .try_deserialize()
    .context("failed to deserialise BackfillConfig")?;

  let store_path = expand_tilde(&backfill_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(id) = cli.revision_request {
    let outcome = backfill_revision_request(&store, id)
      .await
      .with_context(|| format!("failed to backfill revision request {id}"))?;
    match outcome {
      SnapshotFill::Filled(snapshot) => {
        tracing::info!(revision_request_id = %id, origin = ?snapshot.origin, "snapshot written");
      }
      SnapshotFill::AlreadyPresent => {
        tracing::info!(revision_request_id = %id, "snapshot already present, nothing to do");
      }
    }
    return Ok(());
  }

  let options = backfill_cfg.options(cli.bsd_type, cli.batch_size, cli.dry_run);
  let report = backfill_snapshots(&store, &options)
    .await
    .context("backfill aborted")?;

  if report.failed > 0 {
    anyhow::bail!("{} revision request(s) could not be backfilled", report.failed);
  }
  Ok(())
}
