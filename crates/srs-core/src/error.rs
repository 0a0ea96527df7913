//! Error types for `srs-core`.
//!
//! [`Error`] is the domain taxonomy shared by every backend and by the
//! engine. Backends wrap it in their own error type and expose it again
//! through [`DomainError`] so callers can classify failures without knowing
//! the concrete backend.

use thiserror::Error;
use uuid::Uuid;

use crate::snapshot::SnapshotStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("snapshot not found: {0}")]
  SnapshotNotFound(Uuid),

  /// A record names a snapshot that does not exist.
  #[error("record refers to unknown snapshot {0}")]
  UnknownSnapshot(Uuid),

  #[error("record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("snapshot {0} already exists")]
  DuplicateSnapshot(Uuid),

  #[error("record {0} already exists")]
  DuplicateRecord(Uuid),

  #[error(
    "parsed record id mismatch for record {record_id}: expected {expected}, \
     stored {stored:?}"
  )]
  ParsedRecordMismatch {
    record_id: Uuid,
    expected:  Uuid,
    stored:    Option<Uuid>,
  },

  #[error("invalid snapshot status transition: {from} -> {to}")]
  InvalidTransition {
    from: SnapshotStatus,
    to:   SnapshotStatus,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("unsupported operation: {0}")]
  UnsupportedOperation(String),

  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Coarse category of an [`Error`], used by the engine and transport layers
/// to pick a response without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  Validation,
  NotFound,
  Conflict,
  InvalidTransition,
  Unsupported,
  Unavailable,
  Internal,
}

impl Error {
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::UnknownSnapshot(_)
      | Self::DuplicateSnapshot(_)
      | Self::DuplicateRecord(_)
      | Self::Validation(_) => ErrorClass::Validation,
      Self::SnapshotNotFound(_) | Self::RecordNotFound(_) => ErrorClass::NotFound,
      Self::ParsedRecordMismatch { .. } => ErrorClass::Conflict,
      Self::InvalidTransition { .. } => ErrorClass::InvalidTransition,
      Self::UnsupportedOperation(_) => ErrorClass::Unsupported,
      Self::Unavailable(_) => ErrorClass::Unavailable,
      Self::Serialization(_) => ErrorClass::Internal,
    }
  }
}

/// Implemented by backend error types that may carry a domain [`Error`].
///
/// Backend-only failures (I/O, driver errors) are handed back unchanged; the
/// engine treats them as global rather than per-item failures.
pub trait DomainError: Sized {
  /// Take the domain error out, or hand `self` back unchanged.
  fn into_domain(self) -> std::result::Result<Error, Self>;
}

impl DomainError for Error {
  fn into_domain(self) -> std::result::Result<Error, Self> { Ok(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
