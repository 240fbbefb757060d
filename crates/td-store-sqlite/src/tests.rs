//! Integration tests for `SqliteStore` and the snapshot pipeline against an
//! in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};
use td_core::{
  Error as CoreError,
  backfill::{BackfillOptions, BackfillReport, backfill_revision_request, backfill_snapshots},
  bsd::{BsdType, Document},
  event::{ActivityEvent, EventMetadata, NewActivityEvent, StreamId},
  revision::{NewRevisionRequest, RevisionRequest, SnapshotFill, create_revision_request},
  snapshot::{Snapshot, SnapshotOrigin, compute_snapshot},
  store::{DocumentStore, EventStore, PendingQuery, PendingRevision, RevisionStore, StoreError},
  workflow::{AcceptationStatus, BsvhuStatus, Signature, SignatureType, sign_bsvhu},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(secs: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn stream(id: &str) -> StreamId { StreamId::new(id).unwrap() }

fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected an object, got {other}"),
  }
}

async fn append_at(
  s: &SqliteStore,
  id: &str,
  event_type: &str,
  data: Value,
  secs: i64,
) -> ActivityEvent {
  s.append(NewActivityEvent::new(stream(id), event_type, "user-1", data).occurred_at(at(secs)))
    .await
    .unwrap()
}

async fn put_document(s: &SqliteStore, bsd_type: BsdType, id: &str, fields: Value) {
  s.put_document(Document {
    bsd_type,
    id: id.into(),
    fields: object(fields),
    updated_at: Utc::now(),
  })
  .await
  .unwrap();
}

fn new_revision(bsd_type: BsdType, bsd_id: &str) -> NewRevisionRequest {
  NewRevisionRequest {
    bsd_type,
    bsd_id: bsd_id.into(),
    authoring_company_siret: "85001946400021".into(),
    comment: "Erreur sur le code déchet".into(),
    content: object(json!({ "wasteCode": "01 03 08" })),
  }
}

/// A BSDA whose waste code changed once after creation.
async fn seed_bsda(s: &SqliteStore, id: &str) {
  append_at(
    s,
    id,
    "BsdaCreated",
    json!({ "content": { "wasteCode": "06 13 04*", "destinationCap": "CAP-1" } }),
    0,
  )
  .await;
  append_at(s, id, "BsdaUpdated", json!({ "content": { "wasteCode": "17 06 05*" } }), 60).await;
  put_document(
    s,
    BsdType::Bsda,
    id,
    json!({ "id": id, "status": "SENT", "wasteCode": "01 03 08", "destinationCap": "CAP-1" }),
  )
  .await;
}

// ─── Event log ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_assigns_increasing_seq() {
  let s = store().await;
  let first = append_at(&s, "bsda-1", "BsdaCreated", json!({}), 0).await;
  let second = append_at(&s, "bsda-2", "BsdaCreated", json!({}), 0).await;
  let third = append_at(&s, "bsda-1", "BsdaUpdated", json!({}), 1).await;

  assert!(first.seq < second.seq);
  assert!(second.seq < third.seq);
  assert_eq!(first.created_at, at(0));
}

#[tokio::test]
async fn append_stamps_time_when_not_supplied() {
  let s = store().await;
  let before = Utc::now() - chrono::Duration::seconds(1);
  let event = s
    .append(NewActivityEvent::new(stream("bsda-1"), "BsdaCreated", "user-1", json!({})))
    .await
    .unwrap();
  assert!(event.created_at >= before);

  let stored = s.get_events(&stream("bsda-1"), None).await.unwrap();
  assert_eq!(stored, vec![event]);
}

#[tokio::test]
async fn unknown_stream_returns_no_events() {
  let s = store().await;
  let events = s.get_events(&stream("bsdd-9"), None).await.unwrap();
  assert!(events.is_empty());
}

#[tokio::test]
async fn events_are_ordered_by_creation_time() {
  let s = store().await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({ "n": 2 }), 20).await;
  append_at(&s, "bsda-1", "BsdaCreated", json!({ "n": 1 }), 10).await;
  append_at(&s, "bsda-1", "BsdaSigned", json!({ "n": 3 }), 30).await;

  let events = s.get_events(&stream("bsda-1"), None).await.unwrap();
  let order: Vec<_> = events.iter().map(|e| e.data["n"].clone()).collect();
  assert_eq!(order, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn same_timestamp_events_follow_insertion_order() {
  let s = store().await;
  append_at(
    &s,
    "bsda-1",
    "BsdaCreated",
    json!({ "content": { "status": "INITIAL", "wasteCode": "FIRST" } }),
    5,
  )
  .await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({ "content": { "wasteCode": "SECOND" } }), 5).await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({ "content": { "wasteCode": "THIRD" } }), 5).await;

  let events = s.get_events(&stream("bsda-1"), None).await.unwrap();
  assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));

  let state = BsdType::Bsda.fold(&events).unwrap();
  assert_eq!(state.get("wasteCode"), Some(&json!("THIRD")));
}

#[tokio::test]
async fn cutoff_is_inclusive() {
  let s = store().await;
  append_at(&s, "bsda-1", "BsdaCreated", json!({}), 0).await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({}), 10).await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({}), 11).await;

  let events = s.get_events(&stream("bsda-1"), Some(at(10))).await.unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[1].created_at, at(10));
}

#[tokio::test]
async fn streams_are_isolated() {
  let s = store().await;
  append_at(&s, "bsda-1", "BsdaCreated", json!({}), 0).await;
  append_at(&s, "bsda-2", "BsdaCreated", json!({}), 0).await;

  let events = s.get_events(&stream("bsda-1"), None).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].stream_id.as_str(), "bsda-1");
}

#[tokio::test]
async fn metadata_roundtrip() {
  let s = store().await;
  let mut extra = Map::new();
  extra.insert("ip".into(), json!("127.0.0.1"));
  let metadata = EventMetadata {
    auth_type:      Some("SESSION".into()),
    correlation_id: Some("req-42".into()),
    extra,
  };

  s.append(
    NewActivityEvent::created(
      BsdType::Bsdasri,
      stream("dasri-1"),
      "user-1",
      object(json!({ "status": "INITIAL" })),
    )
    .with_metadata(metadata.clone()),
  )
  .await
  .unwrap();

  let events = s.get_events(&stream("dasri-1"), None).await.unwrap();
  assert_eq!(events[0].event_type, "BsdasriCreated");
  assert_eq!(events[0].metadata.as_ref(), Some(&metadata));
  assert_eq!(events[0].data, json!({ "content": { "status": "INITIAL" } }));
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_document_replaces_live_row() {
  let s = store().await;
  put_document(&s, BsdType::Bsdd, "bsdd-1", json!({ "status": "DRAFT" })).await;
  put_document(&s, BsdType::Bsdd, "bsdd-1", json!({ "status": "SEALED" })).await;

  let doc = s.get_document(BsdType::Bsdd, "bsdd-1").await.unwrap().unwrap();
  assert_eq!(doc.get("status"), Some(&json!("SEALED")));
  assert!(s.get_document(BsdType::Bsda, "bsdd-1").await.unwrap().is_none());
}

// ─── Revision requests ───────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_is_written_only_once() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  let request = s
    .create_revision_request(new_revision(BsdType::Bsda, "bsda-1"))
    .await
    .unwrap();
  assert!(request.snapshot.is_none());

  let first = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(0)).await.unwrap();
  let second = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(60)).await.unwrap();
  assert_ne!(first, second);

  assert!(s.set_snapshot_if_absent(request.id, &first).await.unwrap());
  assert!(!s.set_snapshot_if_absent(request.id, &second).await.unwrap());

  let stored = s.get_revision_request(request.id).await.unwrap().unwrap();
  assert_eq!(stored.snapshot, Some(first));
}

#[tokio::test]
async fn pending_listing_filters_by_type_and_cursor() {
  let s = store().await;
  let mut bsda_ids = Vec::new();
  for _ in 0..3 {
    let r = s
      .create_revision_request(new_revision(BsdType::Bsda, "bsda-1"))
      .await
      .unwrap();
    bsda_ids.push(r.id);
  }
  s.create_revision_request(new_revision(BsdType::Bsdd, "bsdd-1"))
    .await
    .unwrap();
  bsda_ids.sort();

  let all = s
    .list_without_snapshot(&PendingQuery { bsd_type: None, after: None, limit: 10 })
    .await
    .unwrap();
  assert_eq!(all.len(), 4);

  let query = PendingQuery {
    bsd_type: Some(BsdType::Bsda),
    after:    Some(bsda_ids[0].to_string()),
    limit:    10,
  };
  let page = s.list_without_snapshot(&query).await.unwrap();
  let ids: Vec<Uuid> = page
    .iter()
    .map(|entry| match entry {
      PendingRevision::Ready(r) => r.id,
      other => panic!("unexpected {other:?}"),
    })
    .collect();
  assert_eq!(ids, bsda_ids[1..].to_vec());
  assert_eq!(page[0].key(), bsda_ids[1].to_string());
}

// ─── Snapshot scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_replays_every_event_before_cutoff() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;

  let snapshot = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(3_600)).await.unwrap();
  assert_eq!(snapshot.origin, SnapshotOrigin::Replayed);
  assert_eq!(snapshot.get("initialWasteCode"), Some(&json!("17 06 05*")));
  assert_eq!(snapshot.get("id"), Some(&json!("bsda-1")));
}

#[tokio::test]
async fn snapshot_ignores_events_after_cutoff() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;

  let events = s.get_events(&stream("bsda-1"), Some(at(30))).await.unwrap();
  assert_eq!(events.len(), 1);

  let snapshot = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(30)).await.unwrap();
  assert_eq!(snapshot.get("initialWasteCode"), Some(&json!("06 13 04*")));
  assert_eq!(snapshot.as_of, at(30));
}

#[tokio::test]
async fn flat_history_without_status_is_replayed() {
  let s = store().await;
  append_at(&s, "bsda-1", "BsdaCreated", json!({ "wasteCode": "06 13 04*" }), 0).await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!({ "wasteCode": "17 06 05*" }), 60).await;
  put_document(&s, BsdType::Bsda, "bsda-1", json!({ "wasteCode": "01 03 08" })).await;

  let early = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(30)).await.unwrap();
  assert_eq!(early.origin, SnapshotOrigin::Replayed);
  assert_eq!(early.get("initialWasteCode"), Some(&json!("06 13 04*")));

  let late = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(3_600)).await.unwrap();
  assert_eq!(late.origin, SnapshotOrigin::Replayed);
  assert_eq!(late.get("initialWasteCode"), Some(&json!("17 06 05*")));
}

#[tokio::test]
async fn typed_constructors_tag_events_for_their_type() {
  let s = store().await;
  let id = stream("bsdd-1");
  let appends = [
    NewActivityEvent::created(BsdType::Bsdd, id.clone(), "u", object(json!({ "status": "DRAFT" }))),
    NewActivityEvent::updated(
      BsdType::Bsdd,
      id.clone(),
      "u",
      object(json!({ "wasteDetailsCode": "16 01 04*" })),
    ),
    NewActivityEvent::signed(BsdType::Bsdd, id.clone(), "u", object(json!({ "status": "SENT" }))),
  ];
  for input in appends {
    s.append(input).await.unwrap();
  }

  let events = s.get_events(&id, None).await.unwrap();
  let tags: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
  assert_eq!(tags, vec!["BsddCreated", "BsddUpdated", "BsddSigned"]);

  let state = BsdType::Bsdd.fold(&events).unwrap();
  assert_eq!(state.get("status"), Some(&json!("SENT")));
  assert_eq!(state.get("wasteDetailsCode"), Some(&json!("16 01 04*")));
}

#[tokio::test]
async fn legacy_document_snapshot_uses_current_row() {
  let s = store().await;
  let row = json!({
    "id": "bsdd-9",
    "status": "PROCESSED",
    "wasteDetailsCode": "16 01 04*",
    "processingOperationDone": "R 4",
    "forwardedIn": { "recipientCap": "CAP-TTR" }
  });
  put_document(&s, BsdType::Bsdd, "bsdd-9", row.clone()).await;

  let snapshot = compute_snapshot(&s, BsdType::Bsdd, "bsdd-9", Utc::now()).await.unwrap();
  assert_eq!(snapshot.origin, SnapshotOrigin::CurrentRow);
  assert_eq!(snapshot.get("initialWasteDetailsCode"), Some(&json!("16 01 04*")));
  assert_eq!(snapshot.get("initialProcessingOperationDone"), Some(&json!("R 4")));
  assert_eq!(snapshot.get("initialTemporaryStorageDestinationCap"), Some(&json!("CAP-TTR")));
  assert_eq!(snapshot.get("initialQuantityReceived"), Some(&Value::Null));
}

#[tokio::test]
async fn incomplete_history_falls_back_to_current_row() {
  let s = store().await;
  // No creation event: the stream starts mid-life.
  append_at(&s, "dasri-1", "BsdasriUpdated", json!({ "content": { "wasteCode": "18 01 02*" } }), 0)
    .await;
  put_document(&s, BsdType::Bsdasri, "dasri-1", json!({ "wasteCode": "18 01 03*" })).await;

  let snapshot = compute_snapshot(&s, BsdType::Bsdasri, "dasri-1", at(10)).await.unwrap();
  assert_eq!(snapshot.origin, SnapshotOrigin::CurrentRow);
  assert_eq!(snapshot.get("initialWasteCode"), Some(&json!("18 01 03*")));
}

#[tokio::test]
async fn malformed_history_falls_back_to_current_row() {
  let s = store().await;
  append_at(&s, "bsda-1", "BsdaCreated", json!({ "content": { "status": "INITIAL" } }), 0).await;
  append_at(&s, "bsda-1", "BsdaUpdated", json!("oops"), 1).await;
  put_document(&s, BsdType::Bsda, "bsda-1", json!({ "wasteCode": "01 03 08" })).await;

  let snapshot = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(10)).await.unwrap();
  assert_eq!(snapshot.origin, SnapshotOrigin::CurrentRow);
  assert_eq!(snapshot.get("initialWasteCode"), Some(&json!("01 03 08")));
}

#[tokio::test]
async fn missing_document_is_an_error() {
  let s = store().await;
  let err = compute_snapshot(&s, BsdType::Bsda, "nope", Utc::now()).await.unwrap_err();
  assert!(matches!(err, CoreError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn applied_revision_is_part_of_later_history() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  s.append(
    NewActivityEvent::revision_applied(
      BsdType::Bsda,
      stream("bsda-1"),
      "user-2",
      Uuid::new_v4(),
      object(json!({ "wasteCode": "01 03 08" })),
    )
    .occurred_at(at(120)),
  )
  .await
  .unwrap();

  let before = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(119)).await.unwrap();
  let after = compute_snapshot(&s, BsdType::Bsda, "bsda-1", at(120)).await.unwrap();
  assert_eq!(before.get("initialWasteCode"), Some(&json!("17 06 05*")));
  assert_eq!(after.get("initialWasteCode"), Some(&json!("01 03 08")));
}

// ─── Revision creation ───────────────────────────────────────────────────────

#[tokio::test]
async fn creating_a_revision_request_attaches_its_snapshot() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;

  let request = create_revision_request(&s, new_revision(BsdType::Bsda, "bsda-1"))
    .await
    .unwrap();
  let snapshot = request.snapshot.clone().expect("snapshot attached");
  assert_eq!(snapshot.as_of, request.created_at);
  assert_eq!(snapshot.get("initialWasteCode"), Some(&json!("17 06 05*")));

  let recomputed = compute_snapshot(&s, BsdType::Bsda, "bsda-1", request.created_at)
    .await
    .unwrap();
  assert_eq!(recomputed, snapshot);

  // Later activity does not leak into the frozen snapshot.
  append_at(&s, "bsda-1", "BsdaUpdated", json!({ "content": { "wasteCode": "X" } }), 86_400 * 3650)
    .await;
  let stored = s.get_revision_request(request.id).await.unwrap().unwrap();
  assert_eq!(stored.snapshot, Some(snapshot));
}

#[tokio::test]
async fn revision_request_survives_missing_document() {
  let s = store().await;

  let request = create_revision_request(&s, new_revision(BsdType::Bsdasri, "dasri-404"))
    .await
    .unwrap();
  assert!(request.snapshot.is_none());

  let stored = s.get_revision_request(request.id).await.unwrap().unwrap();
  assert!(stored.snapshot.is_none());
}

// ─── Unreachable event store ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct ConnectionRefused;

impl StoreError for ConnectionRefused {}

/// Delegates everything to SQLite except the event log, which is down.
struct EventsDown(SqliteStore);

impl EventStore for EventsDown {
  type Error = ConnectionRefused;

  async fn append(&self, _input: NewActivityEvent) -> Result<ActivityEvent, ConnectionRefused> {
    Err(ConnectionRefused)
  }

  async fn get_events(
    &self,
    _stream_id: &StreamId,
    _at_or_before: Option<DateTime<Utc>>,
  ) -> Result<Vec<ActivityEvent>, ConnectionRefused> {
    Err(ConnectionRefused)
  }
}

impl DocumentStore for EventsDown {
  type Error = crate::Error;

  async fn get_document(&self, bsd_type: BsdType, id: &str) -> crate::Result<Option<Document>> {
    self.0.get_document(bsd_type, id).await
  }

  async fn put_document(&self, document: Document) -> crate::Result<()> {
    self.0.put_document(document).await
  }
}

impl RevisionStore for EventsDown {
  type Error = crate::Error;

  async fn create_revision_request(
    &self,
    input: NewRevisionRequest,
  ) -> crate::Result<RevisionRequest> {
    self.0.create_revision_request(input).await
  }

  async fn get_revision_request(&self, id: Uuid) -> crate::Result<Option<RevisionRequest>> {
    self.0.get_revision_request(id).await
  }

  async fn list_without_snapshot(
    &self,
    query: &PendingQuery,
  ) -> crate::Result<Vec<PendingRevision>> {
    self.0.list_without_snapshot(query).await
  }

  async fn set_snapshot_if_absent(&self, id: Uuid, snapshot: &Snapshot) -> crate::Result<bool> {
    self.0.set_snapshot_if_absent(id, snapshot).await
  }
}

#[tokio::test]
async fn unreachable_event_store_does_not_block_revision_creation() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  let down = EventsDown(s.clone());

  let err = compute_snapshot(&down, BsdType::Bsda, "bsda-1", Utc::now()).await.unwrap_err();
  assert!(matches!(err, CoreError::StoreUnavailable(_)));

  let request = create_revision_request(&down, new_revision(BsdType::Bsda, "bsda-1"))
    .await
    .unwrap();
  assert!(request.snapshot.is_none());

  // Nothing partial was persisted; the backfill picks it up once events are back.
  let stored = s.get_revision_request(request.id).await.unwrap().unwrap();
  assert!(stored.snapshot.is_none());

  let report = backfill_snapshots(&s, &BackfillOptions::default()).await.unwrap();
  assert_eq!(report.filled, 1);
  let stored = s.get_revision_request(request.id).await.unwrap().unwrap();
  assert_eq!(
    stored.snapshot.unwrap().get("initialWasteCode"),
    Some(&json!("17 06 05*"))
  );
}

// ─── Backfill ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn backfill_is_idempotent() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  let r1 = s
    .create_revision_request(new_revision(BsdType::Bsda, "bsda-1"))
    .await
    .unwrap();

  let first = backfill_snapshots(&s, &BackfillOptions::default()).await.unwrap();
  assert_eq!(first, BackfillReport { scanned: 1, filled: 1, ..Default::default() });
  let after_first = s.get_revision_request(r1.id).await.unwrap().unwrap().snapshot;
  assert!(after_first.is_some());

  let second = backfill_snapshots(&s, &BackfillOptions::default()).await.unwrap();
  assert_eq!(second, BackfillReport::default());
  let after_second = s.get_revision_request(r1.id).await.unwrap().unwrap().snapshot;
  assert_eq!(after_first, after_second);

  let single = backfill_revision_request(&s, r1.id).await.unwrap();
  assert_eq!(single, SnapshotFill::AlreadyPresent);
  let after_single = s.get_revision_request(r1.id).await.unwrap().unwrap().snapshot;
  assert_eq!(after_first, after_single);
}

#[tokio::test]
async fn backfill_continues_past_failures() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  put_document(&s, BsdType::Bsdd, "bsdd-9", json!({ "wasteDetailsCode": "16 01 04*" })).await;

  let ok = s.create_revision_request(new_revision(BsdType::Bsda, "bsda-1")).await.unwrap();
  let legacy = s.create_revision_request(new_revision(BsdType::Bsdd, "bsdd-9")).await.unwrap();
  let orphan = s.create_revision_request(new_revision(BsdType::Bsda, "bsda-404")).await.unwrap();

  let options = BackfillOptions { batch_size: 1, ..Default::default() };
  let report = backfill_snapshots(&s, &options).await.unwrap();
  assert_eq!(
    report,
    BackfillReport { scanned: 3, filled: 1, degraded: 1, skipped: 0, failed: 1 }
  );

  for id in [ok.id, legacy.id] {
    assert!(s.get_revision_request(id).await.unwrap().unwrap().snapshot.is_some());
  }
  assert!(s.get_revision_request(orphan.id).await.unwrap().unwrap().snapshot.is_none());

  // Once the missing row shows up, a re-run completes the batch.
  put_document(&s, BsdType::Bsda, "bsda-404", json!({ "wasteCode": "17 06 01*" })).await;
  let report = backfill_snapshots(&s, &options).await.unwrap();
  assert_eq!(report, BackfillReport { scanned: 1, degraded: 1, ..Default::default() });
}

#[tokio::test]
async fn backfill_respects_type_filter_and_dry_run() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  put_document(&s, BsdType::Bsdd, "bsdd-1", json!({})).await;
  s.create_revision_request(new_revision(BsdType::Bsda, "bsda-1")).await.unwrap();
  s.create_revision_request(new_revision(BsdType::Bsdd, "bsdd-1")).await.unwrap();

  let dry = BackfillOptions { dry_run: true, ..Default::default() };
  let report = backfill_snapshots(&s, &dry).await.unwrap();
  assert_eq!(report, BackfillReport { scanned: 2, ..Default::default() });

  let only_bsdd = BackfillOptions { bsd_type: Some(BsdType::Bsdd), ..Default::default() };
  let report = backfill_snapshots(&s, &only_bsdd).await.unwrap();
  assert_eq!(report, BackfillReport { scanned: 1, degraded: 1, ..Default::default() });

  let pending = s
    .list_without_snapshot(&PendingQuery { bsd_type: None, after: None, limit: 10 })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert!(matches!(&pending[0], PendingRevision::Ready(r) if r.bsd_type == BsdType::Bsda));
}

const CORRUPT_ID: &str = "00000000-0000-4000-8000-000000000000";

async fn insert_corrupt_revision(s: &SqliteStore) {
  s.execute_raw(
    "INSERT INTO revision_requests (
       revision_id, bsd_type, bsd_id, authoring_company_siret, content_json, created_at
     ) VALUES (
       '00000000-0000-4000-8000-000000000000', 'BSDA', 'bsda-1', '85001946400021', '{}',
       'not-a-date'
     )",
  )
  .await
  .unwrap();
}

#[tokio::test]
async fn unreadable_rows_are_listed_not_fatal() {
  let s = store().await;
  insert_corrupt_revision(&s).await;

  let page = s
    .list_without_snapshot(&PendingQuery { bsd_type: None, after: None, limit: 10 })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert!(matches!(&page[0], PendingRevision::Unreadable { key, .. } if key == CORRUPT_ID));
}

#[tokio::test]
async fn backfill_moves_past_unreadable_rows() {
  let s = store().await;
  seed_bsda(&s, "bsda-1").await;
  let good = s
    .create_revision_request(new_revision(BsdType::Bsda, "bsda-1"))
    .await
    .unwrap();
  insert_corrupt_revision(&s).await;

  let options = BackfillOptions { batch_size: 1, ..Default::default() };
  let report = backfill_snapshots(&s, &options).await.unwrap();
  assert_eq!(report, BackfillReport { scanned: 2, filled: 1, failed: 1, ..Default::default() });
  assert!(s.get_revision_request(good.id).await.unwrap().unwrap().snapshot.is_some());

  let report = backfill_snapshots(&s, &options).await.unwrap();
  assert_eq!(report, BackfillReport { scanned: 1, failed: 1, ..Default::default() });
}

#[tokio::test]
async fn corrupt_row_is_not_reported_as_unavailable() {
  let s = store().await;
  insert_corrupt_revision(&s).await;
  let id = Uuid::parse_str(CORRUPT_ID).unwrap();

  let err = s.get_revision_request(id).await.unwrap_err();
  assert!(err.is_corrupt_record());

  let err = backfill_revision_request(&s, id).await.unwrap_err();
  assert!(matches!(err, CoreError::CorruptRecord(_)));
}

#[tokio::test]
async fn backfill_of_unknown_request_is_an_error() {
  let s = store().await;
  let err = backfill_revision_request(&s, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, CoreError::RevisionRequestNotFound(_)));
}

// ─── BSVHU workflow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn every_bsvhu_transition_appends_one_event() {
  let s = store().await;
  let id = stream("VHU-20240101-AAAA");
  let steps = [
    (SignatureType::Emission, None, BsvhuStatus::SignedByProducer),
    (SignatureType::Transport, None, BsvhuStatus::Sent),
    (SignatureType::Operation, Some(AcceptationStatus::Refused), BsvhuStatus::Refused),
  ];

  let mut status = BsvhuStatus::Initial;
  for (signature_type, acceptation, expected) in steps {
    let signature = Signature { signature_type, author: "Jean".into(), acceptation };
    let (next, event) = sign_bsvhu(&s, &id, "user-1", status, &signature).await.unwrap();
    assert_eq!(next, expected);
    assert_eq!(event.data["status"], json!(expected.to_string()));
    status = next;
  }

  let events = s.get_events(&id, None).await.unwrap();
  assert_eq!(events.len(), 3);
  assert!(events.iter().all(|e| e.event_type == "BsvhuSigned"));
  assert_eq!(events[2].data["destinationReceptionAcceptationStatus"], json!("REFUSED"));
}

#[tokio::test]
async fn rejected_bsvhu_transition_appends_nothing() {
  let s = store().await;
  let id = stream("VHU-20240101-BBBB");
  let signature = Signature {
    signature_type: SignatureType::Operation,
    author:         "Jean".into(),
    acceptation:    None,
  };

  let err = sign_bsvhu(&s, &id, "user-1", BsvhuStatus::Processed, &signature)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidTransition { .. }));
  assert!(s.get_events(&id, None).await.unwrap().is_empty());
}
