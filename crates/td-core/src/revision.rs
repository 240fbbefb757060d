//! Revision requests and the snapshot attached to them at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  bsd::BsdType,
  snapshot::{Snapshot, compute_snapshot},
  store::{DocumentStore, EventStore, RevisionStore},
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// A proposed correction to an already-signed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRequest {
  pub id:                      Uuid,
  pub bsd_type:                BsdType,
  pub bsd_id:                  String,
  pub authoring_company_siret: String,
  pub comment:                 String,
  /// The proposed new values, keyed by column name.
  pub content:                 Map<String, Value>,
  /// Server-assigned; also the cutoff of the snapshot.
  pub created_at:              DateTime<Utc>,
  /// What the document looked like when the request was created. `None`
  /// until computed.
  pub snapshot:                Option<Snapshot>,
}

/// Input to [`create_revision_request`].
#[derive(Debug, Clone)]
pub struct NewRevisionRequest {
  pub bsd_type:                BsdType,
  pub bsd_id:                  String,
  pub authoring_company_siret: String,
  pub comment:                 String,
  pub content:                 Map<String, Value>,
}

/// Result of trying to attach a snapshot to an existing request.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotFill {
  Filled(Snapshot),
  /// The request already had a snapshot; nothing was written.
  AlreadyPresent,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Persist a revision request, then snapshot its document as of the
/// request's creation.
///
/// Only the persistence of the request itself can fail this call. A snapshot
/// that cannot be computed is logged and left `None` for the backfill to
/// retry.
pub async fn create_revision_request<S>(
  store: &S,
  input: NewRevisionRequest,
) -> Result<RevisionRequest>
where
  S: EventStore + DocumentStore + RevisionStore,
{
  let mut request = store
    .create_revision_request(input)
    .await
    .map_err(Error::store)?;

  match fill_snapshot(store, &request).await {
    Ok(SnapshotFill::Filled(snapshot)) => request.snapshot = Some(snapshot),
    Ok(SnapshotFill::AlreadyPresent) => {}
    Err(err) => {
      tracing::warn!(
        revision_request_id = %request.id,
        bsd_id = %request.bsd_id,
        %err,
        "revision request created without snapshot"
      );
    }
  }

  Ok(request)
}

/// Compute the snapshot of `request` (cutoff: its `created_at`) and store it
/// unless one is already present.
pub async fn fill_snapshot<S>(store: &S, request: &RevisionRequest) -> Result<SnapshotFill>
where
  S: EventStore + DocumentStore + RevisionStore,
{
  let snapshot =
    compute_snapshot(store, request.bsd_type, &request.bsd_id, request.created_at).await?;

  let written = store
    .set_snapshot_if_absent(request.id, &snapshot)
    .await
    .map_err(Error::store)?;

  Ok(if written {
    SnapshotFill::Filled(snapshot)
  } else {
    SnapshotFill::AlreadyPresent
  })
}
