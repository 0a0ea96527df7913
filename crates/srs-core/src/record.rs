//! Record types. A record is one physical, versioned copy of a bibliographic entry.
//!
//! A record owns exactly one raw artifact and at most one of a parsed or an
//! error artifact. All physical versions of the same logical entry share a
//! `matched_id`; at most one of them is [`RecordState::Actual`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The encoding of the raw content.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RecordType {
  Marc,
  Edifact,
}

/// Lifecycle state of one physical version.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RecordState {
  #[default]
  Actual,
  Old,
  Deleted,
  Draft,
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

/// The original content as submitted. Never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
  pub id:      Uuid,
  pub content: String,
}

/// The decoded, structured form of the raw content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
  pub id:      Uuid,
  pub content: serde_json::Value,
}

/// Present instead of a [`ParsedRecord`] when decoding failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
  pub id:          Uuid,
  /// The offending text, verbatim.
  pub content:     String,
  pub description: String,
}

// ─── Auxiliary fields ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
  #[serde(default)]
  pub suppress_discovery: bool,
}

/// Identifiers of downstream entities created from this record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdsHolder {
  pub instance_id:   Option<Uuid>,
  pub instance_hrid: Option<String>,
}

/// Audit fields. Always server-assigned from the request context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
  pub created_date:       DateTime<Utc>,
  pub created_by_user_id: Uuid,
  pub updated_date:       DateTime<Utc>,
  pub updated_by_user_id: Uuid,
}

impl Metadata {
  /// Fresh metadata for a row created by `actor` at `at`.
  pub fn created(actor: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      created_date:       at,
      created_by_user_id: actor,
      updated_date:       at,
      updated_by_user_id: actor,
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
  pub id:                  Uuid,
  pub matched_id:          Uuid,
  pub snapshot_id:         Uuid,
  pub record_type:         RecordType,
  pub state:               RecordState,
  pub order:               Option<i32>,
  pub raw_record:          RawRecord,
  pub parsed_record:       Option<ParsedRecord>,
  pub error_record:        Option<ErrorRecord>,
  pub additional_info:     AdditionalInfo,
  pub external_ids_holder: ExternalIdsHolder,
  pub metadata:            Metadata,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The outcome of decoding raw content, as attached to a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Decoding {
  Parsed(serde_json::Value),
  Failed {
    content:     String,
    description: String,
  },
}

/// Input to [`crate::store::SourceStorage::save_record`].
///
/// `metadata` and artifact ids are always assigned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
  /// Physical id; generated when absent.
  pub id:                  Option<Uuid>,
  /// Logical id; defaults to the physical id.
  pub matched_id:          Option<Uuid>,
  pub snapshot_id:         Uuid,
  pub record_type:         RecordType,
  #[serde(default)]
  pub state:               RecordState,
  pub order:               Option<i32>,
  pub raw_content:         String,
  pub decoding:            Option<Decoding>,
  #[serde(default)]
  pub additional_info:     AdditionalInfo,
  #[serde(default)]
  pub external_ids_holder: ExternalIdsHolder,
}

impl NewRecord {
  /// Convenience constructor: an ACTUAL MARC record with no decoding yet.
  pub fn new(snapshot_id: Uuid, raw_content: impl Into<String>) -> Self {
    Self {
      id: None,
      matched_id: None,
      snapshot_id,
      record_type: RecordType::Marc,
      state: RecordState::Actual,
      order: None,
      raw_content: raw_content.into(),
      decoding: None,
      additional_info: AdditionalInfo::default(),
      external_ids_holder: ExternalIdsHolder::default(),
    }
  }
}

/// Input to [`crate::store::SourceStorage::update_parsed_record`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRecordUpdate {
  /// The record whose parsed content is replaced. Items without one cannot
  /// be resolved and are reported as batch errors.
  pub record_id:           Option<Uuid>,
  /// When present, must equal the stored parsed record's id.
  pub parsed_record_id:    Option<Uuid>,
  pub content:             serde_json::Value,
  pub external_ids_holder: Option<ExternalIdsHolder>,
  pub additional_info:     Option<AdditionalInfo>,
}

/// A raw record submitted to the test-mode bulk loader.
#[derive(Debug, Clone, Deserialize)]
pub struct TestRawRecord {
  pub id:      Uuid,
  pub content: String,
}

/// A page of records plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCollection {
  pub records:       Vec<Record>,
  pub total_records: u64,
}

// ─── Source records ──────────────────────────────────────────────────────────

/// A record as seen by consumers of its content: identity, both content
/// forms and the downstream links, without lifecycle bookkeeping.
///
/// Only records with a parsed artifact have a source-record form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
  pub record_id:           Uuid,
  pub snapshot_id:         Uuid,
  pub record_type:         RecordType,
  pub order:               Option<i32>,
  pub raw_record:          RawRecord,
  pub parsed_record:       ParsedRecord,
  pub additional_info:     AdditionalInfo,
  pub external_ids_holder: ExternalIdsHolder,
  pub metadata:            Metadata,
  pub deleted:             bool,
}

impl SourceRecord {
  /// `None` when `record` has no parsed content.
  pub fn project(record: Record) -> Option<Self> {
    let parsed_record = record.parsed_record?;
    Some(Self {
      record_id: record.id,
      snapshot_id: record.snapshot_id,
      record_type: record.record_type,
      order: record.order,
      raw_record: record.raw_record,
      parsed_record,
      additional_info: record.additional_info,
      external_ids_holder: record.external_ids_holder,
      metadata: record.metadata,
      deleted: record.state == RecordState::Deleted,
    })
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecordCollection {
  pub source_records: Vec<SourceRecord>,
  pub total_records:  u64,
}
