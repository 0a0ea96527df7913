//! The SQLite implementation of [`SourceStorage`].

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use srs_core::{
  query::{RecordFilter, RecordQuery},
  record::{
    Decoding, ErrorRecord, Metadata, NewRecord, ParsedRecord,
    ParsedRecordUpdate, RawRecord, Record, RecordCollection, RecordState,
    SourceRecord, SourceRecordCollection,
  },
  snapshot::{NewSnapshot, Snapshot, SnapshotStatus},
  store::SourceStorage,
};
use uuid::Uuid;

use crate::{
  encode::{
    decode_dt, decode_enum, decode_uuid, encode_dt, encode_uuid, now,
    RecordRow, SnapshotRow,
  },
  query::{compile_filter, order_clause, page},
  schema::{RECORD_COLUMNS, RECORD_FROM, SCHEMA},
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A source-record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// run on the connection's worker thread, so writes are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Connection-level helpers ────────────────────────────────────────────────
//
// These run inside `conn.call` closures, usually on an open transaction.
// Domain failures travel as the inner `Err` of `Ok(Err(..))` so the closure
// can still distinguish them from driver errors.

type Outcome<T> = tokio_rusqlite::Result<Result<T>>;

/// `updated_date` for a row last touched at `prev`: never earlier than now
/// and always strictly after `prev`.
fn advance(prev: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
  now.max(prev + Duration::microseconds(1))
}

fn select_snapshot(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<SnapshotRow>> {
  conn
    .query_row(
      "SELECT snapshot_id, status, processing_started_date
       FROM snapshots WHERE snapshot_id = ?1",
      rusqlite::params![id],
      SnapshotRow::from_row,
    )
    .optional()
}

fn select_record(
  conn: &Connection,
  predicate: &str,
  id: &str,
) -> rusqlite::Result<Option<RecordRow>> {
  conn
    .query_row(
      &format!("{RECORD_COLUMNS} {RECORD_FROM} WHERE {predicate}"),
      rusqlite::params![id],
      RecordRow::from_row,
    )
    .optional()
}

fn record_updated_date(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT updated_date FROM records WHERE id = ?1",
      rusqlite::params![id],
      |row| row.get(0),
    )
    .optional()
}

/// Demote every `ACTUAL` row sharing `matched_id` to `OLD`.
fn demote_actual(
  conn: &Connection,
  matched_id: &str,
  actor: &str,
  now: DateTime<Utc>,
) -> Outcome<usize> {
  let previous = {
    let mut stmt = conn.prepare(
      "SELECT id, updated_date FROM records
       WHERE matched_id = ?1 AND state = 'ACTUAL'",
    )?;
    stmt
      .query_map(rusqlite::params![matched_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  for (id, updated) in &previous {
    let prev = match decode_dt(updated) {
      Ok(dt) => dt,
      Err(e) => return Ok(Err(e)),
    };
    conn.execute(
      "UPDATE records SET state = 'OLD', updated_date = ?1, updated_by_user_id = ?2
       WHERE id = ?3",
      rusqlite::params![encode_dt(advance(prev, now)), actor, id],
    )?;
  }
  Ok(Ok(previous.len()))
}

fn insert_record(conn: &Connection, record: &Record) -> tokio_rusqlite::Result<()> {
  let id = encode_uuid(record.id);
  conn.execute(
    "INSERT INTO records (
       id, matched_id, snapshot_id, record_type, state, \"order\",
       suppress_discovery, instance_id, instance_hrid,
       created_date, created_by_user_id, updated_date, updated_by_user_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    rusqlite::params![
      id,
      encode_uuid(record.matched_id),
      encode_uuid(record.snapshot_id),
      record.record_type.as_ref(),
      record.state.as_ref(),
      record.order,
      record.additional_info.suppress_discovery,
      record.external_ids_holder.instance_id.map(encode_uuid),
      record.external_ids_holder.instance_hrid,
      encode_dt(record.metadata.created_date),
      encode_uuid(record.metadata.created_by_user_id),
      encode_dt(record.metadata.updated_date),
      encode_uuid(record.metadata.updated_by_user_id),
    ],
  )?;
  conn.execute(
    "INSERT INTO raw_records (id, record_id, content) VALUES (?1, ?2, ?3)",
    rusqlite::params![encode_uuid(record.raw_record.id), id, record.raw_record.content],
  )?;
  if let Some(parsed) = &record.parsed_record {
    conn.execute(
      "INSERT INTO parsed_records (id, record_id, content) VALUES (?1, ?2, ?3)",
      rusqlite::params![encode_uuid(parsed.id), id, parsed.content.to_string()],
    )?;
  }
  if let Some(error) = &record.error_record {
    conn.execute(
      "INSERT INTO error_records (id, record_id, content, description)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![encode_uuid(error.id), id, error.content, error.description],
    )?;
  }
  Ok(())
}

/// Build the full domain record for a [`NewRecord`]. The raw artifact shares
/// the record's id; parsed and error artifacts get fresh ids.
fn build_record(input: NewRecord, actor: Uuid, at: DateTime<Utc>) -> Record {
  let id = input.id.unwrap_or_else(Uuid::new_v4);
  let (parsed_record, error_record) = match input.decoding {
    Some(Decoding::Parsed(content)) => {
      (Some(ParsedRecord { id: Uuid::new_v4(), content }), None)
    }
    Some(Decoding::Failed { content, description }) => (
      None,
      Some(ErrorRecord { id: Uuid::new_v4(), content, description }),
    ),
    None => (None, None),
  };

  Record {
    id,
    matched_id: input.matched_id.unwrap_or(id),
    snapshot_id: input.snapshot_id,
    record_type: input.record_type,
    state: input.state,
    order: input.order,
    raw_record: RawRecord { id, content: input.raw_content },
    parsed_record,
    error_record,
    additional_info: input.additional_info,
    external_ids_holder: input.external_ids_holder,
    metadata: Metadata::created(actor, at),
  }
}

// ─── SourceStorage impl ──────────────────────────────────────────────────────

impl SourceStorage for SqliteStore {
  type Error = Error;

  // ── Snapshots ─────────────────────────────────────────────────────────────

  async fn create_snapshot(&self, input: NewSnapshot) -> Result<Snapshot> {
    let snapshot = Snapshot {
      snapshot_id:             input.snapshot_id,
      status:                  input.status,
      processing_started_date: (input.status == SnapshotStatus::ParsingInProgress)
        .then(now),
    };

    let id_str      = encode_uuid(snapshot.snapshot_id);
    let status_str  = snapshot.status.as_ref().to_owned();
    let started_str = snapshot.processing_started_date.map(encode_dt);
    let snapshot_id = snapshot.snapshot_id;

    self
      .conn
      .call(move |conn| -> Outcome<()> {
        if select_snapshot(conn, &id_str)?.is_some() {
          return Ok(Err(srs_core::Error::DuplicateSnapshot(snapshot_id).into()));
        }
        conn.execute(
          "INSERT INTO snapshots (snapshot_id, status, processing_started_date)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, status_str, started_str],
        )?;
        Ok(Ok(()))
      })
      .await??;

    tracing::debug!(%snapshot_id, status = %snapshot.status, "snapshot created");
    Ok(snapshot)
  }

  async fn get_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>> {
    let id_str = encode_uuid(id);

    let raw: Option<SnapshotRow> = self
      .conn
      .call(move |conn| Ok(select_snapshot(conn, &id_str)?))
      .await?;

    raw.map(SnapshotRow::into_snapshot).transpose()
  }

  async fn update_snapshot_status(
    &self,
    id: Uuid,
    status: SnapshotStatus,
  ) -> Result<Snapshot> {
    let id_str = encode_uuid(id);
    let at     = now();

    let raw: SnapshotRow = self
      .conn
      .call(move |conn| -> Outcome<SnapshotRow> {
        let tx = conn.transaction()?;
        let Some(current) = select_snapshot(&tx, &id_str)? else {
          return Ok(Err(srs_core::Error::SnapshotNotFound(id).into()));
        };
        let from: SnapshotStatus =
          match decode_enum("snapshot status", &current.status) {
            Ok(s) => s,
            Err(e) => return Ok(Err(e)),
          };
        if !from.can_transition_to(status) {
          return Ok(Err(
            srs_core::Error::InvalidTransition { from, to: status }.into(),
          ));
        }

        let started = match current.processing_started_date {
          None if status == SnapshotStatus::ParsingInProgress => {
            Some(encode_dt(at))
          }
          other => other,
        };
        tx.execute(
          "UPDATE snapshots SET status = ?1, processing_started_date = ?2
           WHERE snapshot_id = ?3",
          rusqlite::params![status.as_ref(), started, id_str],
        )?;
        let updated = select_snapshot(&tx, &id_str)?;
        tx.commit()?;
        Ok(updated.ok_or(srs_core::Error::SnapshotNotFound(id).into()))
      })
      .await??;

    tracing::debug!(snapshot_id = %id, %status, "snapshot status updated");
    raw.into_snapshot()
  }

  async fn delete_all_snapshots(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(
          "DELETE FROM error_records;
           DELETE FROM parsed_records;
           DELETE FROM raw_records;
           DELETE FROM records;
           DELETE FROM snapshots;",
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::warn!("all snapshots and records deleted");
    Ok(())
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn save_record(&self, input: NewRecord, actor: Uuid) -> Result<Record> {
    let record = build_record(input, actor, now());
    let row    = record.clone();

    let demoted = self
      .conn
      .call(move |conn| -> Outcome<usize> {
        let tx = conn.transaction()?;
        let snapshot_str = encode_uuid(row.snapshot_id);
        if select_snapshot(&tx, &snapshot_str)?.is_none() {
          return Ok(Err(srs_core::Error::UnknownSnapshot(row.snapshot_id).into()));
        }
        if record_updated_date(&tx, &encode_uuid(row.id))?.is_some() {
          return Ok(Err(srs_core::Error::DuplicateRecord(row.id).into()));
        }

        let demoted = if row.state == RecordState::Actual {
          match demote_actual(
            &tx,
            &encode_uuid(row.matched_id),
            &encode_uuid(actor),
            row.metadata.created_date,
          )? {
            Ok(n) => n,
            Err(e) => return Ok(Err(e)),
          }
        } else {
          0
        };

        insert_record(&tx, &row)?;
        tx.commit()?;
        Ok(Ok(demoted))
      })
      .await??;

    if demoted > 0 {
      tracing::debug!(
        record_id = %record.id,
        matched_id = %record.matched_id,
        demoted,
        "previous ACTUAL version moved to OLD"
      );
    }
    Ok(record)
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<Record>> {
    let id_str = encode_uuid(id);

    let raw: Option<RecordRow> = self
      .conn
      .call(move |conn| Ok(select_record(conn, "r.id = ?1", &id_str)?))
      .await?;

    raw.map(RecordRow::into_record).transpose()
  }

  async fn get_record_by_matched_id(
    &self,
    matched_id: Uuid,
  ) -> Result<Option<Record>> {
    let id_str = encode_uuid(matched_id);

    let raw: Option<RecordRow> = self
      .conn
      .call(move |conn| {
        Ok(select_record(
          conn,
          "r.matched_id = ?1 AND r.state = 'ACTUAL'",
          &id_str,
        )?)
      })
      .await?;

    raw.map(RecordRow::into_record).transpose()
  }

  async fn update_parsed_record(
    &self,
    update: ParsedRecordUpdate,
    actor: Uuid,
  ) -> Result<Record> {
    let Some(record_id) = update.record_id else {
      return Err(
        srs_core::Error::Validation("parsed record update has no record id".into())
          .into(),
      );
    };
    let id_str    = encode_uuid(record_id);
    let actor_str = encode_uuid(actor);
    let content   = update.content.to_string();
    let at        = now();

    let raw: RecordRow = self
      .conn
      .call(move |conn| -> Outcome<RecordRow> {
        let tx = conn.transaction()?;
        let Some(prev) = record_updated_date(&tx, &id_str)? else {
          return Ok(Err(srs_core::Error::RecordNotFound(record_id).into()));
        };
        let prev = match decode_dt(&prev) {
          Ok(dt) => dt,
          Err(e) => return Ok(Err(e)),
        };

        let stored: Option<String> = tx
          .query_row(
            "SELECT id FROM parsed_records WHERE record_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        let stored = match stored.as_deref().map(decode_uuid).transpose() {
          Ok(s) => s,
          Err(e) => return Ok(Err(e)),
        };

        if let Some(expected) = update.parsed_record_id {
          if stored != Some(expected) {
            return Ok(Err(
              srs_core::Error::ParsedRecordMismatch { record_id, expected, stored }
                .into(),
            ));
          }
        }

        match stored {
          Some(parsed_id) => {
            tx.execute(
              "UPDATE parsed_records SET content = ?1 WHERE id = ?2",
              rusqlite::params![content, encode_uuid(parsed_id)],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO parsed_records (id, record_id, content) VALUES (?1, ?2, ?3)",
              rusqlite::params![encode_uuid(Uuid::new_v4()), id_str, content],
            )?;
          }
        }
        tx.execute(
          "DELETE FROM error_records WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?;

        tx.execute(
          "UPDATE records SET updated_date = ?1, updated_by_user_id = ?2
           WHERE id = ?3",
          rusqlite::params![encode_dt(advance(prev, at)), actor_str, id_str],
        )?;
        if let Some(ext) = &update.external_ids_holder {
          tx.execute(
            "UPDATE records SET instance_id = ?1, instance_hrid = ?2 WHERE id = ?3",
            rusqlite::params![
              ext.instance_id.map(encode_uuid),
              ext.instance_hrid,
              id_str
            ],
          )?;
        }
        if let Some(info) = &update.additional_info {
          tx.execute(
            "UPDATE records SET suppress_discovery = ?1 WHERE id = ?2",
            rusqlite::params![info.suppress_discovery, id_str],
          )?;
        }

        let updated = select_record(&tx, "r.id = ?1", &id_str)?;
        tx.commit()?;
        Ok(updated.ok_or(srs_core::Error::RecordNotFound(record_id).into()))
      })
      .await??;

    tracing::debug!(%record_id, "parsed record replaced");
    raw.into_record()
  }

  async fn delete_record(&self, id: Uuid, actor: Uuid) -> Result<Record> {
    let id_str    = encode_uuid(id);
    let actor_str = encode_uuid(actor);
    let at        = now();

    let raw: RecordRow = self
      .conn
      .call(move |conn| -> Outcome<RecordRow> {
        let tx = conn.transaction()?;
        let Some(prev) = record_updated_date(&tx, &id_str)? else {
          return Ok(Err(srs_core::Error::RecordNotFound(id).into()));
        };
        let prev = match decode_dt(&prev) {
          Ok(dt) => dt,
          Err(e) => return Ok(Err(e)),
        };
        tx.execute(
          "UPDATE records
           SET state = 'DELETED', updated_date = ?1, updated_by_user_id = ?2
           WHERE id = ?3",
          rusqlite::params![encode_dt(advance(prev, at)), actor_str, id_str],
        )?;
        let updated = select_record(&tx, "r.id = ?1", &id_str)?;
        tx.commit()?;
        Ok(updated.ok_or(srs_core::Error::RecordNotFound(id).into()))
      })
      .await??;

    tracing::debug!(record_id = %id, "record marked DELETED");
    raw.into_record()
  }

  async fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> Result<RecordCollection> {
    let compiled = compile_filter(&query.filter);
    let order    = order_clause(&query.order_by);
    let (limit, offset) = page(query);

    let (total, raws): (i64, Vec<RecordRow>) = self
      .conn
      .call(move |conn| {
        let predicate = compiled.predicate;
        let mut params = compiled.params;

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) {RECORD_FROM} WHERE {predicate}"),
          rusqlite::params_from_iter(params.iter()),
          |row| row.get(0),
        )?;

        let n = params.len();
        params.push(rusqlite::types::Value::Integer(limit));
        params.push(rusqlite::types::Value::Integer(offset));
        let sql = format!(
          "{RECORD_COLUMNS} {RECORD_FROM} WHERE {predicate} {order}
           LIMIT ?{} OFFSET ?{}",
          n + 1,
          n + 2,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RecordRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, rows))
      })
      .await?;

    let records = raws
      .into_iter()
      .map(RecordRow::into_record)
      .collect::<Result<Vec<_>>>()?;

    Ok(RecordCollection {
      records,
      total_records: u64::try_from(total)
        .map_err(|_| Error::Decode(format!("negative count {total}")))?,
    })
  }

  async fn list_source_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> Result<SourceRecordCollection> {
    let query = RecordQuery {
      filter: RecordFilter::HasParsedRecord(true).and(query.filter.clone()),
      ..query.clone()
    };
    let page = self.list_records(&query).await?;

    Ok(SourceRecordCollection {
      source_records: page
        .records
        .into_iter()
        .filter_map(SourceRecord::project)
        .collect(),
      total_records:  page.total_records,
    })
  }
}
