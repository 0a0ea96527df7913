//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond
//! precision so that lexical order equals chronological order. Enumerations
//! use their wire names. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use srs_core::{
  record::{
    AdditionalInfo, ErrorRecord, ExternalIdsHolder, Metadata, ParsedRecord,
    RawRecord, Record,
  },
  snapshot::Snapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store persists.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `snapshots` row.
pub struct SnapshotRow {
  pub snapshot_id:             String,
  pub status:                  String,
  pub processing_started_date: Option<String>,
}

impl SnapshotRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      snapshot_id:             row.get(0)?,
      status:                  row.get(1)?,
      processing_started_date: row.get(2)?,
    })
  }

  pub fn into_snapshot(self) -> Result<Snapshot> {
    Ok(Snapshot {
      snapshot_id:             decode_uuid(&self.snapshot_id)?,
      status:                  decode_enum("snapshot status", &self.status)?,
      processing_started_date: self
        .processing_started_date
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Raw values read from a `records` row joined with its artifacts.
pub struct RecordRow {
  // records columns
  pub id:                 String,
  pub matched_id:         String,
  pub snapshot_id:        String,
  pub record_type:        String,
  pub state:              String,
  pub order:              Option<i32>,
  pub suppress_discovery: bool,
  pub instance_id:        Option<String>,
  pub instance_hrid:      Option<String>,
  pub created_date:       String,
  pub created_by_user_id: String,
  pub updated_date:       String,
  pub updated_by_user_id: String,
  // raw_records join
  pub raw_id:             String,
  pub raw_content:        String,
  // parsed_records join
  pub parsed_id:          Option<String>,
  pub parsed_content:     Option<String>,
  // error_records join
  pub error_id:           Option<String>,
  pub error_content:      Option<String>,
  pub error_description:  Option<String>,
}

impl RecordRow {
  /// Column order is fixed by [`crate::schema::RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      matched_id:         row.get(1)?,
      snapshot_id:        row.get(2)?,
      record_type:        row.get(3)?,
      state:              row.get(4)?,
      order:              row.get(5)?,
      suppress_discovery: row.get(6)?,
      instance_id:        row.get(7)?,
      instance_hrid:      row.get(8)?,
      created_date:       row.get(9)?,
      created_by_user_id: row.get(10)?,
      updated_date:       row.get(11)?,
      updated_by_user_id: row.get(12)?,
      raw_id:             row.get(13)?,
      raw_content:        row.get(14)?,
      parsed_id:          row.get(15)?,
      parsed_content:     row.get(16)?,
      error_id:           row.get(17)?,
      error_content:      row.get(18)?,
      error_description:  row.get(19)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    let parsed_record = match (self.parsed_id, self.parsed_content) {
      (Some(id), Some(content)) => Some(ParsedRecord {
        id:      decode_uuid(&id)?,
        content: serde_json::from_str(&content)?,
      }),
      _ => None,
    };

    let error_record = match (self.error_id, self.error_content) {
      (Some(id), Some(content)) => Some(ErrorRecord {
        id: decode_uuid(&id)?,
        content,
        description: self.error_description.unwrap_or_default(),
      }),
      _ => None,
    };

    Ok(Record {
      id: decode_uuid(&self.id)?,
      matched_id: decode_uuid(&self.matched_id)?,
      snapshot_id: decode_uuid(&self.snapshot_id)?,
      record_type: decode_enum("record type", &self.record_type)?,
      state: decode_enum("record state", &self.state)?,
      order: self.order,
      raw_record: RawRecord {
        id:      decode_uuid(&self.raw_id)?,
        content: self.raw_content,
      },
      parsed_record,
      error_record,
      additional_info: AdditionalInfo {
        suppress_discovery: self.suppress_discovery,
      },
      external_ids_holder: ExternalIdsHolder {
        instance_id:   self
          .instance_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
        instance_hrid: self.instance_hrid,
      },
      metadata: Metadata {
        created_date:       decode_dt(&self.created_date)?,
        created_by_user_id: decode_uuid(&self.created_by_user_id)?,
        updated_date:       decode_dt(&self.updated_date)?,
        updated_by_user_id: decode_uuid(&self.updated_by_user_id)?,
      },
    })
  }
}
