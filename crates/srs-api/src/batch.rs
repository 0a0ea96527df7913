//! Handlers for batch endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/batch/records` | Body: `{"records":[…]}`; 201, or 500 if every item failed |
//! | `PUT`  | `/batch/parsed-records` | Body: `{"records":[…]}`; 200, 400 if no item names a record, 500 if every item failed |
//! | `POST` | `/populate-test-records` | Body: `{"rawRecords":[…]}`; test mode only, 204, or 500 if any item failed |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use srs_core::{
  record::{NewRecord, ParsedRecordUpdate, Record, TestRawRecord},
  store::SourceStorage,
};
use srs_engine::{BatchError, BatchResult, RecordService};

use crate::{context::Context, error::ApiError};

// ─── Bodies ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordsBody<T> {
  pub records: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecordsBody {
  pub raw_records: Vec<TestRawRecord>,
}

/// Response body of every batch endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
  pub records:       Vec<Record>,
  pub errors:        Vec<BatchError>,
  pub total_records: usize,
}

impl From<BatchResult<Record>> for BatchResponse {
  fn from(result: BatchResult<Record>) -> Self {
    Self {
      total_records: result.succeeded.len(),
      records:       result.succeeded,
      errors:        result.errors,
    }
  }
}

/// `ok` unless every item failed.
fn respond(ok: StatusCode, result: BatchResult<Record>) -> Response {
  let status = if result.is_failure() {
    StatusCode::INTERNAL_SERVER_ERROR
  } else {
    ok
  };
  (status, Json(BatchResponse::from(result))).into_response()
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// `POST /batch/records`
pub async fn create_records<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Context(ctx): Context,
  Json(body): Json<RecordsBody<NewRecord>>,
) -> Result<Response, ApiError> {
  let result = service.create_records(&ctx, body.records).await?;
  Ok(respond(StatusCode::CREATED, result))
}

/// `PUT /batch/parsed-records`
pub async fn update_parsed_records<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Context(ctx): Context,
  Json(body): Json<RecordsBody<ParsedRecordUpdate>>,
) -> Result<Response, ApiError> {
  let result = service.update_parsed_records(&ctx, body.records).await?;
  Ok(respond(StatusCode::OK, result))
}

/// `POST /populate-test-records`
pub async fn populate_test_records<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Context(ctx): Context,
  Json(body): Json<TestRecordsBody>,
) -> Result<Response, ApiError> {
  let result = service.populate_test_records(&ctx, body.raw_records).await?;
  if !result.errors.is_empty() {
    let response = BatchResponse::from(result);
    return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response());
  }
  Ok(StatusCode::NO_CONTENT.into_response())
}
