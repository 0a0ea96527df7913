//! [`RecordService`]: the operations exposed over a [`SourceStorage`].

use std::{collections::HashMap, sync::Arc};

use srs_core::{
  context::RequestContext,
  query::RecordQuery,
  record::{
    Decoding, NewRecord, ParsedRecordUpdate, Record, RecordCollection,
    RecordState, RecordType, SourceRecordCollection, TestRawRecord,
  },
  snapshot::{NewSnapshot, STUB_SNAPSHOT_ID, Snapshot, SnapshotStatus},
  store::SourceStorage,
};
use uuid::Uuid;

use crate::{
  batch::{fan_out, BatchError, BatchResult, Job},
  EngineConfig, Error, Result,
};

/// Returned by maintenance operations outside test mode.
const TEST_MODE_ONLY: &str = "Endpoint is available only in test mode";

pub struct RecordService<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S> Clone for RecordService<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: self.config.clone(),
    }
  }
}

impl<S: SourceStorage> RecordService<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
    Self { store, config }
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  fn require_test_mode(&self) -> Result<()> {
    if self.config.test_mode {
      Ok(())
    } else {
      Err(srs_core::Error::Unavailable(TEST_MODE_ONLY.into()).into())
    }
  }

  // ─── Snapshots ─────────────────────────────────────────────────────────────

  pub async fn create_snapshot(&self, input: NewSnapshot) -> Result<Snapshot> {
    self.store.create_snapshot(input).await.map_err(Error::from_store)
  }

  pub async fn get_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>> {
    self.store.get_snapshot(id).await.map_err(Error::from_store)
  }

  pub async fn update_snapshot_status(
    &self,
    id: Uuid,
    status: SnapshotStatus,
  ) -> Result<Snapshot> {
    self
      .store
      .update_snapshot_status(id, status)
      .await
      .map_err(Error::from_store)
  }

  /// Remove every snapshot and record. Test mode only.
  pub async fn delete_all(&self) -> Result<()> {
    self.require_test_mode()?;
    self.store.delete_all_snapshots().await.map_err(Error::from_store)
  }

  // ─── Record creation ───────────────────────────────────────────────────────

  /// Attach a decoding to `input` unless the caller supplied one. Decode
  /// failures are kept on the record, never raised.
  fn decode(mut input: NewRecord) -> NewRecord {
    if input.decoding.is_none() {
      let decoding = srs_parser::decode(input.record_type, &input.raw_content);
      if let Decoding::Failed { description, .. } = &decoding {
        tracing::error!(record_id = ?input.id, %description, "raw content failed to decode");
      }
      input.decoding = Some(decoding);
    }
    input
  }

  pub async fn create_record(
    &self,
    ctx: &RequestContext,
    input: NewRecord,
  ) -> Result<Record> {
    self
      .store
      .save_record(Self::decode(input), ctx.actor())
      .await
      .map_err(Error::from_store)
  }

  /// Create every record of `inputs`, each independently.
  ///
  /// Items referring to an unknown snapshot are reported without reaching
  /// the store. When that applies to every item the call fails.
  pub async fn create_records(
    &self,
    ctx: &RequestContext,
    inputs: Vec<NewRecord>,
  ) -> Result<BatchResult<Record>> {
    if inputs.is_empty() {
      return Err(srs_core::Error::Validation("record batch is empty".into()).into());
    }

    let mut known = HashMap::new();
    for input in &inputs {
      if !known.contains_key(&input.snapshot_id) {
        let exists = self.get_snapshot(input.snapshot_id).await?.is_some();
        known.insert(input.snapshot_id, exists);
      }
    }

    let total = inputs.len();
    let mut errors = Vec::new();
    let mut pending = Vec::new();
    let mut first_missing = None;
    for (index, input) in inputs.into_iter().enumerate() {
      if known.get(&input.snapshot_id).copied().unwrap_or(false) {
        pending.push((index, input));
      } else {
        first_missing.get_or_insert(input.snapshot_id);
        let err = srs_core::Error::UnknownSnapshot(input.snapshot_id);
        tracing::warn!(index, error = %err, "batch item rejected");
        errors.push(BatchError { index, reference: input.id, message: err.to_string() });
      }
    }
    if pending.is_empty() {
      if let Some(missing) = first_missing {
        return Err(srs_core::Error::UnknownSnapshot(missing).into());
      }
    }

    let actor = ctx.actor();
    let jobs = pending
      .into_iter()
      .map(|(index, input)| Job {
        index,
        reference: input.id,
        call: self.store.save_record(Self::decode(input), actor),
      })
      .collect();

    let result = fan_out(jobs, self.config.batch_concurrency, errors).await?;
    tracing::info!(
      total,
      succeeded = result.succeeded.len(),
      failed = result.errors.len(),
      "record batch created"
    );
    Ok(result)
  }

  // ─── Parsed record updates ─────────────────────────────────────────────────

  /// Replace the parsed content of every record named in `updates`.
  ///
  /// Items without a record id are reported per item. When no item has one
  /// the call is rejected before touching the store.
  pub async fn update_parsed_records(
    &self,
    ctx: &RequestContext,
    updates: Vec<ParsedRecordUpdate>,
  ) -> Result<BatchResult<Record>> {
    if updates.iter().all(|u| u.record_id.is_none()) {
      return Err(Error::BadRequest(
        "no parsed record update carries a record id".into(),
      ));
    }

    let total = updates.len();
    let mut errors = Vec::new();
    let mut pending = Vec::new();
    for (index, update) in updates.into_iter().enumerate() {
      if update.record_id.is_some() {
        pending.push((index, update));
      } else {
        tracing::warn!(index, "parsed record update has no record id");
        errors.push(BatchError {
          index,
          reference: None,
          message: "parsed record update has no record id".into(),
        });
      }
    }

    let actor = ctx.actor();
    let jobs = pending
      .into_iter()
      .map(|(index, update)| Job {
        index,
        reference: update.record_id,
        call: self.store.update_parsed_record(update, actor),
      })
      .collect();

    let result = fan_out(jobs, self.config.batch_concurrency, errors).await?;
    tracing::info!(
      total,
      succeeded = result.succeeded.len(),
      failed = result.errors.len(),
      "parsed record batch updated"
    );
    Ok(result)
  }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_record(&self, id: Uuid) -> Result<Option<Record>> {
    self.store.get_record(id).await.map_err(Error::from_store)
  }

  /// The current `ACTUAL` version of a logical record.
  pub async fn get_record_by_matched_id(
    &self,
    matched_id: Uuid,
  ) -> Result<Option<Record>> {
    self
      .store
      .get_record_by_matched_id(matched_id)
      .await
      .map_err(Error::from_store)
  }

  pub async fn list_records(&self, query: &RecordQuery) -> Result<RecordCollection> {
    self.store.list_records(query).await.map_err(Error::from_store)
  }

  /// Always fails with [`srs_core::Error::UnsupportedOperation`].
  pub async fn list_records_by_query_string(
    &self,
    query: &str,
  ) -> Result<RecordCollection> {
    #[allow(deprecated)]
    let result = self.store.get_records_by_query_string(query).await;
    result.map_err(Error::from_store)
  }

  /// Records with parsed content, in their source-record form.
  pub async fn list_source_records(
    &self,
    query: &RecordQuery,
  ) -> Result<SourceRecordCollection> {
    self
      .store
      .list_source_records(query)
      .await
      .map_err(Error::from_store)
  }

  /// Always fails with [`srs_core::Error::UnsupportedOperation`].
  pub async fn list_source_records_by_query_string(
    &self,
    query: &str,
  ) -> Result<SourceRecordCollection> {
    #[allow(deprecated)]
    let result = self.store.get_source_records_by_query_string(query).await;
    result.map_err(Error::from_store)
  }

  pub async fn delete_record(&self, ctx: &RequestContext, id: Uuid) -> Result<Record> {
    self
      .store
      .delete_record(id, ctx.actor())
      .await
      .map_err(Error::from_store)
  }

  // ─── Bulk test loader ──────────────────────────────────────────────────────

  /// Load raw MARC records under the stub snapshot. Test mode only.
  ///
  /// Each record becomes its own logical record (`matched_id == id`).
  pub async fn populate_test_records(
    &self,
    ctx: &RequestContext,
    records: Vec<TestRawRecord>,
  ) -> Result<BatchResult<Record>> {
    self.require_test_mode()?;
    self.ensure_stub_snapshot().await?;

    let inputs = records
      .into_iter()
      .map(|raw| NewRecord {
        id: Some(raw.id),
        matched_id: Some(raw.id),
        state: RecordState::Actual,
        record_type: RecordType::Marc,
        ..NewRecord::new(STUB_SNAPSHOT_ID, raw.content)
      })
      .collect::<Vec<_>>();
    if inputs.is_empty() {
      return Ok(BatchResult { succeeded: Vec::new(), errors: Vec::new() });
    }
    self.create_records(ctx, inputs).await
  }

  async fn ensure_stub_snapshot(&self) -> Result<()> {
    if self.get_snapshot(STUB_SNAPSHOT_ID).await?.is_some() {
      return Ok(());
    }
    let created = self
      .create_snapshot(NewSnapshot {
        snapshot_id: STUB_SNAPSHOT_ID,
        status:      SnapshotStatus::Committed,
      })
      .await;
    match created {
      Ok(_) | Err(Error::Domain(srs_core::Error::DuplicateSnapshot(_))) => Ok(()),
      Err(e) => Err(e),
    }
  }
}
