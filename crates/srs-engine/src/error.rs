//! Error type for `srs-engine`.

use srs_core::{DomainError, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Domain(#[from] srs_core::Error),

  /// The backend failed for reasons unrelated to the request.
  #[error("storage backend error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The request as a whole cannot be acted on.
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl Error {
  /// Lift a backend error, keeping any domain error it carries.
  pub(crate) fn from_store<E>(err: E) -> Self
  where
    E: DomainError + std::error::Error + Send + Sync + 'static,
  {
    match err.into_domain() {
      Ok(domain) => Error::Domain(domain),
      Err(other) => Error::Store(Box::new(other)),
    }
  }

  /// `None` for [`Error::BadRequest`], which has no domain counterpart.
  pub fn class(&self) -> Option<ErrorClass> {
    match self {
      Error::Domain(e) => Some(e.class()),
      Error::Store(_) => Some(ErrorClass::Internal),
      Error::BadRequest(_) => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
