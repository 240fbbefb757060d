//! One-off backfill of snapshots on revision requests that lack one.
//!
//! Items are independent: a failure (including a row that cannot be decoded)
//! is logged, counted and left unfilled for a later run, and the batch moves
//! on. Re-running is safe because a snapshot is only ever written where the
//! column is still null.

use uuid::Uuid;

use crate::{
  Error, Result,
  bsd::BsdType,
  revision::{SnapshotFill, fill_snapshot},
  snapshot::SnapshotOrigin,
  store::{DocumentStore, EventStore, PendingQuery, PendingRevision, RevisionStore},
};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct BackfillOptions {
  /// Restrict to one document type.
  pub bsd_type:   Option<BsdType>,
  pub batch_size: usize,
  /// Only count pending requests; compute and write nothing.
  pub dry_run:    bool,
}

impl Default for BackfillOptions {
  fn default() -> Self {
    Self { bsd_type: None, batch_size: DEFAULT_BATCH_SIZE, dry_run: false }
  }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
  pub scanned:  usize,
  /// Written from replayed history.
  pub filled:   usize,
  /// Written from current values because history was unusable.
  pub degraded: usize,
  /// Already filled by a concurrent writer.
  pub skipped:  usize,
  pub failed:   usize,
}

/// Fill every pending snapshot, page by page.
///
/// Only a failure to list a page aborts the run.
pub async fn backfill_snapshots<S>(store: &S, options: &BackfillOptions) -> Result<BackfillReport>
where
  S: EventStore + DocumentStore + RevisionStore,
{
  let mut report = BackfillReport::default();
  let mut query = PendingQuery {
    bsd_type: options.bsd_type,
    after:    None,
    limit:    options.batch_size.max(1),
  };

  loop {
    let page = store
      .list_without_snapshot(&query)
      .await
      .map_err(Error::store)?;
    let Some(last) = page.last() else { break };
    query.after = Some(last.key());

    for entry in &page {
      report.scanned += 1;
      let request = match entry {
        PendingRevision::Ready(request) => request,
        PendingRevision::Unreadable { key, reason } => {
          report.failed += 1;
          tracing::error!(
            revision_request_id = %key,
            %reason,
            "unreadable revision request, skipped"
          );
          continue;
        }
      };
      if options.dry_run {
        continue;
      }

      match fill_snapshot(store, request).await {
        Ok(SnapshotFill::Filled(snapshot)) => match snapshot.origin {
          SnapshotOrigin::Replayed => report.filled += 1,
          SnapshotOrigin::CurrentRow => report.degraded += 1,
        },
        Ok(SnapshotFill::AlreadyPresent) => report.skipped += 1,
        Err(err) => {
          report.failed += 1;
          tracing::warn!(
            revision_request_id = %request.id,
            bsd_type = %request.bsd_type,
            bsd_id = %request.bsd_id,
            %err,
            "snapshot backfill failed, leaving for a later run"
          );
        }
      }
    }

    if page.len() < query.limit {
      break;
    }
  }

  tracing::info!(
    scanned = report.scanned,
    filled = report.filled,
    degraded = report.degraded,
    skipped = report.skipped,
    failed = report.failed,
    dry_run = options.dry_run,
    "snapshot backfill finished"
  );
  Ok(report)
}

/// Backfill a single revision request. A request that already carries a
/// snapshot is left untouched.
pub async fn backfill_revision_request<S>(store: &S, id: Uuid) -> Result<SnapshotFill>
where
  S: EventStore + DocumentStore + RevisionStore,
{
  let request = store
    .get_revision_request(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::RevisionRequestNotFound(id))?;

  if request.snapshot.is_some() {
    return Ok(SnapshotFill::AlreadyPresent);
  }
  fill_snapshot(store, &request).await
}
