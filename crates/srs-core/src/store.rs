//! The `SourceStorage` trait.
//!
//! The trait is implemented by storage backends (e.g. `srs-store-sqlite`).
//! Higher layers (`srs-engine`, `srs-api`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::{DomainError, Error},
  query::RecordQuery,
  record::{
    NewRecord, ParsedRecordUpdate, Record, RecordCollection,
    SourceRecordCollection,
  },
  snapshot::{NewSnapshot, Snapshot, SnapshotStatus},
};

/// Abstraction over a source-record storage backend.
///
/// Records are never hard-deleted; deletion and supersession are state
/// transitions. Every method reaches the backend; implementations must not
/// cache.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SourceStorage: Send + Sync {
  type Error: std::error::Error
    + From<Error>
    + DomainError
    + Send
    + Sync
    + 'static;

  // ── Snapshots ─────────────────────────────────────────────────────────

  /// Persist a new snapshot. Fails with [`Error::DuplicateSnapshot`] if the
  /// id is taken.
  fn create_snapshot(
    &self,
    input: NewSnapshot,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Retrieve a snapshot by id. Returns `None` if not found.
  fn get_snapshot(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  /// Move a snapshot to `status`. Backward moves fail with
  /// [`Error::InvalidTransition`].
  fn update_snapshot_status(
    &self,
    id: Uuid,
    status: SnapshotStatus,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Remove every snapshot and every record that references one.
  ///
  /// This bypasses the record lifecycle entirely and exists for test
  /// fixtures and administrative resets. Never call it against a production
  /// store.
  fn delete_all_snapshots(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Persist a new record version attributed to `actor`.
  ///
  /// When the new record is `ACTUAL`, any other `ACTUAL` row sharing its
  /// `matched_id` becomes `OLD` in the same atomic unit as the insert.
  fn save_record(
    &self,
    input: NewRecord,
    actor: Uuid,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Retrieve a record by physical id. Returns `None` if not found.
  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Retrieve the `ACTUAL` version of a logical record.
  fn get_record_by_matched_id(
    &self,
    matched_id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Replace a record's parsed content. Identity fields and state are never
  /// touched; `updated_date` / `updated_by_user_id` always advance.
  fn update_parsed_record(
    &self,
    update: ParsedRecordUpdate,
    actor: Uuid,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Mark a record `DELETED`.
  fn delete_record(
    &self,
    id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Evaluate a typed query.
  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<RecordCollection, Self::Error>> + Send + 'a;

  /// Lookup by a free-text query string. No longer supported; use
  /// [`SourceStorage::list_records`].
  #[deprecated(note = "build a RecordQuery instead")]
  fn get_records_by_query_string<'a>(
    &'a self,
    _query: &'a str,
  ) -> impl Future<Output = Result<RecordCollection, Self::Error>> + Send + 'a {
    async {
      Err(
        Error::UnsupportedOperation(
          "lookup of records by query string is no longer supported".into(),
        )
        .into(),
      )
    }
  }

  /// Evaluate a typed query over records that have parsed content, in their
  /// source-record form.
  fn list_source_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<SourceRecordCollection, Self::Error>> + Send + 'a;

  /// Source-record lookup by a free-text query string. No longer supported;
  /// use [`SourceStorage::list_source_records`].
  #[deprecated(note = "build a RecordQuery instead")]
  fn get_source_records_by_query_string<'a>(
    &'a self,
    _query: &'a str,
  ) -> impl Future<Output = Result<SourceRecordCollection, Self::Error>> + Send + 'a
  {
    async {
      Err(
        Error::UnsupportedOperation(
          "lookup of source records by query string is no longer supported".into(),
        )
        .into(),
      )
    }
  }
}
