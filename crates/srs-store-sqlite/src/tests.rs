//! Integration tests for `SqliteStore` against an in-memory database.

use serde_json::json;
use srs_core::{
  query::{OrderBy, RecordField, RecordFilter, RecordQuery},
  record::{
    AdditionalInfo, Decoding, ExternalIdsHolder, NewRecord, ParsedRecordUpdate,
    RecordState, RecordType,
  },
  snapshot::{NewSnapshot, SnapshotStatus},
  store::SourceStorage,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn snapshot(s: &SqliteStore) -> Uuid {
  let id = Uuid::new_v4();
  s.create_snapshot(NewSnapshot {
    snapshot_id: id,
    status:      SnapshotStatus::ParsingInProgress,
  })
  .await
  .unwrap();
  id
}

fn parsed(snapshot_id: Uuid, raw: &str) -> NewRecord {
  NewRecord {
    decoding: Some(Decoding::Parsed(json!({ "leader": raw }))),
    ..NewRecord::new(snapshot_id, raw)
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_snapshot() {
  let s = store().await;
  let id = snapshot(&s).await;

  let fetched = s.get_snapshot(id).await.unwrap().unwrap();
  assert_eq!(fetched.status, SnapshotStatus::ParsingInProgress);
  assert!(fetched.processing_started_date.is_some());
}

#[tokio::test]
async fn get_snapshot_missing_returns_none() {
  let s = store().await;
  assert!(s.get_snapshot(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_snapshot_is_rejected() {
  let s = store().await;
  let id = snapshot(&s).await;
  let err = s
    .create_snapshot(NewSnapshot {
      snapshot_id: id,
      status:      SnapshotStatus::ParsingInProgress,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::DuplicateSnapshot(d)) if d == id));
}

#[tokio::test]
async fn snapshot_status_moves_forward_only() {
  let s = store().await;
  let id = snapshot(&s).await;

  let updated = s
    .update_snapshot_status(id, SnapshotStatus::ParsingFinished)
    .await
    .unwrap();
  assert_eq!(updated.status, SnapshotStatus::ParsingFinished);
  // The start stamp survives later transitions.
  assert!(updated.processing_started_date.is_some());

  let err = s
    .update_snapshot_status(id, SnapshotStatus::ParsingInProgress)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(srs_core::Error::InvalidTransition {
      from: SnapshotStatus::ParsingFinished,
      to:   SnapshotStatus::ParsingInProgress,
    })
  ));

  let stored = s.get_snapshot(id).await.unwrap().unwrap();
  assert_eq!(stored.status, SnapshotStatus::ParsingFinished);
}

#[tokio::test]
async fn committed_snapshot_is_terminal() {
  let s = store().await;
  let id = snapshot(&s).await;
  s.update_snapshot_status(id, SnapshotStatus::Committed)
    .await
    .unwrap();

  let err = s
    .update_snapshot_status(id, SnapshotStatus::Error)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn update_status_of_missing_snapshot() {
  let s = store().await;
  let err = s
    .update_snapshot_status(Uuid::new_v4(), SnapshotStatus::Committed)
    .await
    .unwrap_err();
  let Error::Core(core) = err else { panic!("expected a domain error") };
  assert!(matches!(core, srs_core::Error::SnapshotNotFound(_)));
  assert_eq!(core.class(), srs_core::ErrorClass::NotFound);
}

#[tokio::test]
async fn delete_all_snapshots_removes_records_too() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let record = s.save_record(parsed(snap, "a"), Uuid::nil()).await.unwrap();

  s.delete_all_snapshots().await.unwrap();

  assert!(s.get_snapshot(snap).await.unwrap().is_none());
  assert!(s.get_record(record.id).await.unwrap().is_none());
  let all = s.list_records(&RecordQuery::default()).await.unwrap();
  assert_eq!(all.total_records, 0);
}

// ─── Record creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_record() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let actor = Uuid::new_v4();

  let saved = s.save_record(parsed(snap, "raw"), actor).await.unwrap();
  assert_eq!(saved.matched_id, saved.id);
  assert_eq!(saved.raw_record.id, saved.id);
  assert_eq!(saved.state, RecordState::Actual);
  assert_eq!(saved.metadata.created_by_user_id, actor);
  assert!(!saved.additional_info.suppress_discovery);

  let fetched = s.get_record(saved.id).await.unwrap().unwrap();
  assert_eq!(fetched, saved);
}

#[tokio::test]
async fn save_record_with_failed_decoding() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let input = NewRecord {
    decoding: Some(Decoding::Failed {
      content:     "garbage".into(),
      description: "Error parsing MARC record".into(),
    }),
    ..NewRecord::new(snap, "garbage")
  };

  let saved = s.save_record(input, Uuid::nil()).await.unwrap();
  assert!(saved.parsed_record.is_none());
  let error = saved.error_record.unwrap();
  assert_eq!(error.content, "garbage");

  let fetched = s.get_record(saved.id).await.unwrap().unwrap();
  assert!(fetched.parsed_record.is_none());
  assert_eq!(fetched.error_record.unwrap().description, "Error parsing MARC record");
}

#[tokio::test]
async fn save_record_with_unknown_snapshot_fails() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s
    .save_record(parsed(missing, "raw"), Uuid::nil())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::UnknownSnapshot(id)) if id == missing));
}

#[tokio::test]
async fn save_record_twice_is_a_duplicate() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let id = Uuid::new_v4();
  let input = NewRecord { id: Some(id), ..parsed(snap, "raw") };

  s.save_record(input.clone(), Uuid::nil()).await.unwrap();
  let err = s.save_record(input, Uuid::nil()).await.unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::DuplicateRecord(d)) if d == id));
}

#[tokio::test]
async fn new_actual_version_demotes_previous() {
  let s = store().await;
  let snap = snapshot(&s).await;

  let first = s.save_record(parsed(snap, "v1"), Uuid::nil()).await.unwrap();
  let second = s
    .save_record(
      NewRecord { matched_id: Some(first.id), ..parsed(snap, "v2") },
      Uuid::nil(),
    )
    .await
    .unwrap();

  let versions = s
    .list_records(&RecordQuery::new(RecordFilter::MatchedId(first.id)))
    .await
    .unwrap();
  assert_eq!(versions.total_records, 2);
  let actual = versions
    .records
    .iter()
    .filter(|r| r.state == RecordState::Actual)
    .collect::<Vec<_>>();
  assert_eq!(actual.len(), 1);
  assert_eq!(actual[0].id, second.id);

  let old = s.get_record(first.id).await.unwrap().unwrap();
  assert_eq!(old.state, RecordState::Old);
  assert!(old.metadata.updated_date > first.metadata.updated_date);

  let current = s.get_record_by_matched_id(first.id).await.unwrap().unwrap();
  assert_eq!(current.id, second.id);
}

#[tokio::test]
async fn draft_version_leaves_actual_alone() {
  let s = store().await;
  let snap = snapshot(&s).await;

  let first = s.save_record(parsed(snap, "v1"), Uuid::nil()).await.unwrap();
  s.save_record(
    NewRecord {
      matched_id: Some(first.id),
      state: RecordState::Draft,
      ..parsed(snap, "draft")
    },
    Uuid::nil(),
  )
  .await
  .unwrap();

  let current = s.get_record_by_matched_id(first.id).await.unwrap().unwrap();
  assert_eq!(current.id, first.id);
}

#[tokio::test]
async fn concurrent_versions_keep_single_actual() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let matched = Uuid::new_v4();

  let saves = (0..8).map(|i| {
    let s = s.clone();
    async move {
      s.save_record(
        NewRecord { matched_id: Some(matched), ..parsed(snap, &format!("v{i}")) },
        Uuid::nil(),
      )
      .await
    }
  });
  for result in futures::future::join_all(saves).await {
    result.unwrap();
  }

  let actual = s
    .list_records(&RecordQuery::new(
      RecordFilter::MatchedId(matched).and(RecordFilter::State(RecordState::Actual)),
    ))
    .await
    .unwrap();
  assert_eq!(actual.total_records, 1);
}

// ─── Parsed record updates ───────────────────────────────────────────────────

fn update_for(record_id: Uuid, content: serde_json::Value) -> ParsedRecordUpdate {
  ParsedRecordUpdate {
    record_id: Some(record_id),
    parsed_record_id: None,
    content,
    external_ids_holder: None,
    additional_info: None,
  }
}

#[tokio::test]
async fn update_parsed_record_replaces_content_only() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let saved = s.save_record(parsed(snap, "raw"), Uuid::nil()).await.unwrap();
  let editor = Uuid::new_v4();

  let updated = s
    .update_parsed_record(update_for(saved.id, json!({ "leader": "new" })), editor)
    .await
    .unwrap();

  assert_eq!(updated.id, saved.id);
  assert_eq!(updated.matched_id, saved.matched_id);
  assert_eq!(updated.snapshot_id, saved.snapshot_id);
  assert_eq!(updated.state, saved.state);
  assert_eq!(updated.raw_record, saved.raw_record);
  let parsed_record = updated.parsed_record.unwrap();
  assert_eq!(parsed_record.id, saved.parsed_record.unwrap().id);
  assert_eq!(parsed_record.content, json!({ "leader": "new" }));
  assert_eq!(updated.metadata.updated_by_user_id, editor);
  assert_eq!(updated.metadata.created_date, saved.metadata.created_date);
  assert!(updated.metadata.updated_date > saved.metadata.updated_date);
}

#[tokio::test]
async fn repeated_update_is_idempotent_but_advances_updated_date() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let saved = s.save_record(parsed(snap, "raw"), Uuid::nil()).await.unwrap();
  let content = json!({ "leader": "same" });

  let first = s
    .update_parsed_record(update_for(saved.id, content.clone()), Uuid::nil())
    .await
    .unwrap();
  let second = s
    .update_parsed_record(update_for(saved.id, content.clone()), Uuid::nil())
    .await
    .unwrap();

  assert_eq!(first.parsed_record, second.parsed_record);
  assert!(second.metadata.updated_date > first.metadata.updated_date);
}

#[tokio::test]
async fn update_replaces_error_record() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let input = NewRecord {
    decoding: Some(Decoding::Failed {
      content:     "bad".into(),
      description: "Error parsing MARC record".into(),
    }),
    ..NewRecord::new(snap, "bad")
  };
  let saved = s.save_record(input, Uuid::nil()).await.unwrap();

  let updated = s
    .update_parsed_record(update_for(saved.id, json!({ "fields": [] })), Uuid::nil())
    .await
    .unwrap();
  assert!(updated.error_record.is_none());
  assert_eq!(updated.parsed_record.unwrap().content, json!({ "fields": [] }));
}

#[tokio::test]
async fn update_applies_external_ids_and_additional_info() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let saved = s.save_record(parsed(snap, "raw"), Uuid::nil()).await.unwrap();
  let instance = Uuid::new_v4();

  let updated = s
    .update_parsed_record(
      ParsedRecordUpdate {
        external_ids_holder: Some(ExternalIdsHolder {
          instance_id:   Some(instance),
          instance_hrid: Some("in001".into()),
        }),
        additional_info: Some(AdditionalInfo { suppress_discovery: true }),
        ..update_for(saved.id, json!({}))
      },
      Uuid::nil(),
    )
    .await
    .unwrap();

  assert_eq!(updated.external_ids_holder.instance_id, Some(instance));
  assert_eq!(updated.external_ids_holder.instance_hrid.as_deref(), Some("in001"));
  assert!(updated.additional_info.suppress_discovery);
}

#[tokio::test]
async fn update_with_wrong_parsed_id_conflicts() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let saved = s.save_record(parsed(snap, "raw"), Uuid::nil()).await.unwrap();
  let wrong = Uuid::new_v4();

  let err = s
    .update_parsed_record(
      ParsedRecordUpdate {
        parsed_record_id: Some(wrong),
        ..update_for(saved.id, json!({}))
      },
      Uuid::nil(),
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(srs_core::Error::ParsedRecordMismatch { expected, .. }) if expected == wrong
  ));

  let untouched = s.get_record(saved.id).await.unwrap().unwrap();
  assert_eq!(untouched, saved);
}

#[tokio::test]
async fn update_missing_record_is_not_found() {
  let s = store().await;
  let err = s
    .update_parsed_record(update_for(Uuid::new_v4(), json!({})), Uuid::nil())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::RecordNotFound(_))));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_record_is_a_state_transition() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let saved = s.save_record(parsed(snap, "raw"), Uuid::nil()).await.unwrap();

  let deleted = s.delete_record(saved.id, Uuid::nil()).await.unwrap();
  assert_eq!(deleted.state, RecordState::Deleted);

  let fetched = s.get_record(saved.id).await.unwrap().unwrap();
  assert_eq!(fetched.state, RecordState::Deleted);
  assert!(s.get_record_by_matched_id(saved.matched_id).await.unwrap().is_none());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_records_filters_and_pages() {
  let s = store().await;
  let snap_a = snapshot(&s).await;
  let snap_b = snapshot(&s).await;

  for i in 0..5 {
    s.save_record(NewRecord { order: Some(i), ..parsed(snap_a, "a") }, Uuid::nil())
      .await
      .unwrap();
  }
  s.save_record(parsed(snap_b, "b"), Uuid::nil()).await.unwrap();

  let query = RecordQuery::new(RecordFilter::SnapshotId(snap_a))
    .order_by(OrderBy::desc(RecordField::Order))
    .page(1, 2);
  let page = s.list_records(&query).await.unwrap();

  assert_eq!(page.total_records, 5);
  let orders = page.records.iter().map(|r| r.order).collect::<Vec<_>>();
  assert_eq!(orders, vec![Some(3), Some(2)]);
}

#[tokio::test]
async fn list_records_default_order_is_insertion_order() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let mut ids = Vec::new();
  for i in 0..3 {
    ids.push(
      s.save_record(parsed(snap, &format!("r{i}")), Uuid::nil())
        .await
        .unwrap()
        .id,
    );
  }

  let all = s.list_records(&RecordQuery::default()).await.unwrap();
  assert_eq!(all.records.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn list_records_by_error_presence_and_type() {
  let s = store().await;
  let snap = snapshot(&s).await;
  s.save_record(parsed(snap, "ok"), Uuid::nil()).await.unwrap();
  let failed = s
    .save_record(
      NewRecord {
        record_type: RecordType::Edifact,
        decoding: Some(Decoding::Failed {
          content:     "x".into(),
          description: "Error parsing EDIFACT record".into(),
        }),
        ..NewRecord::new(snap, "x")
      },
      Uuid::nil(),
    )
    .await
    .unwrap();

  let errors = s
    .list_records(&RecordQuery::new(RecordFilter::HasErrorRecord(true)))
    .await
    .unwrap();
  assert_eq!(errors.total_records, 1);
  assert_eq!(errors.records[0].id, failed.id);

  let marc = s
    .list_records(&RecordQuery::new(
      RecordFilter::RecordType(RecordType::Edifact).not(),
    ))
    .await
    .unwrap();
  assert_eq!(marc.total_records, 1);
  assert_eq!(marc.records[0].record_type, RecordType::Marc);
}

#[tokio::test]
async fn query_string_lookup_is_unsupported() {
  let s = store().await;
  #[allow(deprecated)]
  let err = s
    .get_records_by_query_string("state==ACTUAL")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::UnsupportedOperation(_))));
}

#[tokio::test]
async fn source_records_need_parsed_content() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let kept = s.save_record(parsed(snap, "ok"), Uuid::nil()).await.unwrap();
  s.save_record(
    NewRecord {
      decoding: Some(Decoding::Failed {
        content:     "junk".into(),
        description: "bad leader".into(),
      }),
      ..NewRecord::new(snap, "junk")
    },
    Uuid::nil(),
  )
  .await
  .unwrap();

  let page = s.list_source_records(&RecordQuery::default()).await.unwrap();
  assert_eq!(page.total_records, 1);
  let source = &page.source_records[0];
  assert_eq!(source.record_id, kept.id);
  assert_eq!(source.snapshot_id, snap);
  assert_eq!(source.raw_record.content, "ok");
  assert_eq!(source.parsed_record.content, json!({ "leader": "ok" }));
  assert!(!source.deleted);
}

#[tokio::test]
async fn source_records_flag_and_filter_deleted() {
  let s = store().await;
  let snap = snapshot(&s).await;
  let live = s.save_record(parsed(snap, "live"), Uuid::nil()).await.unwrap();
  let gone = s.save_record(parsed(snap, "gone"), Uuid::nil()).await.unwrap();
  s.delete_record(gone.id, Uuid::nil()).await.unwrap();

  let actual = s
    .list_source_records(&RecordQuery::new(RecordFilter::source_records(false)))
    .await
    .unwrap();
  assert_eq!(actual.total_records, 1);
  assert_eq!(actual.source_records[0].record_id, live.id);

  let with_deleted = s
    .list_source_records(&RecordQuery::new(RecordFilter::source_records(true)))
    .await
    .unwrap();
  assert_eq!(with_deleted.total_records, 2);
  let flags = with_deleted
    .source_records
    .iter()
    .map(|r| (r.record_id, r.deleted))
    .collect::<Vec<_>>();
  assert_eq!(flags, vec![(live.id, false), (gone.id, true)]);
}

#[tokio::test]
async fn source_record_query_string_lookup_is_unsupported() {
  let s = store().await;
  #[allow(deprecated)]
  let err = s
    .get_source_records_by_query_string("recordType==MARC")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(srs_core::Error::UnsupportedOperation(_))));
}
