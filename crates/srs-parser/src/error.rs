//! Error types for the srs-parser decoders.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("record is shorter than the 24-byte leader ({0} bytes)")]
  LeaderTooShort(usize),

  #[error("invalid leader: {0}")]
  InvalidLeader(String),

  #[error("missing record terminator")]
  MissingRecordTerminator,

  #[error("malformed directory: {0}")]
  MalformedDirectory(String),

  #[error("field {tag} points outside the record")]
  FieldOutOfBounds { tag: String },

  #[error("data field {tag} is missing its indicators")]
  MissingIndicators { tag: String },

  #[error("field {tag} is not valid UTF-8")]
  InvalidUtf8 { tag: String },

  #[error("invalid UNA service string advice")]
  InvalidServiceAdvice,

  #[error("interchange contains no segments")]
  EmptyInterchange,

  #[error("invalid segment tag: {0:?}")]
  InvalidSegmentTag(String),

  #[error("unterminated segment: {0:?}")]
  UnterminatedSegment(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

/// A decode failure together with the verbatim content that caused it.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ParseError {
  pub kind:    Error,
  pub content: String,
}

impl ParseError {
  pub(crate) fn new(kind: Error, content: &str) -> Self {
    Self { kind, content: content.to_owned() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
