//! Snapshots. A snapshot is one ingestion batch.
//!
//! Every record belongs to exactly one snapshot. A snapshot's status only
//! ever moves forward through the ingestion lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Ingestion lifecycle of a snapshot, in lifecycle order.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
  ParsingInProgress,
  ParsingFinished,
  ProcessingInProgress,
  Committed,
  Error,
}

impl SnapshotStatus {
  fn rank(self) -> u8 {
    match self {
      Self::ParsingInProgress => 0,
      Self::ParsingFinished => 1,
      Self::ProcessingInProgress => 2,
      Self::Committed => 3,
      Self::Error => 4,
    }
  }

  /// `Committed` and `Error` accept no further transitions.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Committed | Self::Error)
  }

  /// Whether moving from `self` to `next` is a legal forward transition.
  ///
  /// Re-applying the current status is accepted as a no-op. Any non-terminal
  /// status may fail over to `Error`.
  pub fn can_transition_to(self, next: Self) -> bool {
    if self == next {
      return true;
    }
    if self.is_terminal() {
      return false;
    }
    next == Self::Error || next.rank() > self.rank()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  /// The id of the job execution that produced this batch.
  pub snapshot_id:             Uuid,
  pub status:                  SnapshotStatus,
  /// Set when the snapshot enters `PARSING_IN_PROGRESS`.
  pub processing_started_date: Option<DateTime<Utc>>,
}

/// Input to [`crate::store::SourceStorage::create_snapshot`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSnapshot {
  pub snapshot_id: Uuid,
  pub status:      SnapshotStatus,
}

/// The snapshot that owns records loaded through the test-mode bulk loader.
pub const STUB_SNAPSHOT_ID: Uuid = Uuid::nil();
