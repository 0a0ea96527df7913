//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use srs_core::ErrorClass;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Engine(#[from] srs_engine::Error),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Engine(e) => match e.class() {
        None => StatusCode::BAD_REQUEST,
        Some(ErrorClass::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorClass::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorClass::Conflict | ErrorClass::InvalidTransition) => {
          StatusCode::CONFLICT
        }
        Some(ErrorClass::Unsupported) => StatusCode::NOT_IMPLEMENTED,
        Some(ErrorClass::Unavailable) => StatusCode::BAD_REQUEST,
        Some(ErrorClass::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
