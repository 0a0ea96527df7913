//! Handlers for `/records` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/records` | Body: a new record; raw content is decoded |
//! | `GET`    | `/records` | Typed filters, see [`ListParams`]; `?query=` is rejected with 501 |
//! | `GET`    | `/records/{id}` | 404 if not found |
//! | `DELETE` | `/records/{id}` | Marks the record `DELETED`; 204 |
//! | `GET`    | `/records/matched/{id}` | Current `ACTUAL` version |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use srs_core::{
  query::{OrderBy, RecordField, RecordFilter, RecordQuery, SortDirection},
  record::{NewRecord, Record, RecordCollection, RecordState, RecordType},
  store::SourceStorage,
};
use srs_engine::RecordService;
use uuid::Uuid;

use crate::{context::Context, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records`
pub async fn create<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Context(ctx): Context,
  Json(body): Json<NewRecord>,
) -> Result<impl IntoResponse, ApiError> {
  let record = service.create_record(&ctx, body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// Query parameters for `GET /records`. Every present filter narrows the
/// result.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  /// Free-text query; no longer supported.
  pub query:              Option<String>,
  pub snapshot_id:        Option<Uuid>,
  pub matched_id:         Option<Uuid>,
  pub state:              Option<RecordState>,
  pub record_type:        Option<RecordType>,
  pub suppress_discovery: Option<bool>,
  pub instance_id:        Option<Uuid>,
  pub has_errors:         Option<bool>,
  pub order_by:           Option<RecordField>,
  #[serde(default)]
  pub direction:          SortDirection,
  #[serde(default)]
  pub offset:             usize,
  pub limit:              Option<usize>,
}

impl ListParams {
  fn into_query(self) -> RecordQuery {
    let filters = [
      self.snapshot_id.map(RecordFilter::SnapshotId),
      self.matched_id.map(RecordFilter::MatchedId),
      self.state.map(RecordFilter::State),
      self.record_type.map(RecordFilter::RecordType),
      self.suppress_discovery.map(RecordFilter::SuppressDiscovery),
      self.instance_id.map(RecordFilter::InstanceId),
      self.has_errors.map(RecordFilter::HasErrorRecord),
    ];
    let filter = filters
      .into_iter()
      .flatten()
      .fold(RecordFilter::All, RecordFilter::and);

    let mut query = RecordQuery::new(filter).page(
      self.offset,
      self.limit.unwrap_or(RecordQuery::DEFAULT_LIMIT),
    );
    if let Some(field) = self.order_by {
      query = query.order_by(OrderBy { field, direction: self.direction });
    }
    query
  }
}

/// `GET /records`
pub async fn list<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<RecordCollection>, ApiError> {
  if let Some(text) = &params.query {
    let records = service.list_records_by_query_string(text).await?;
    return Ok(Json(records));
  }
  let records = service.list_records(&params.into_query()).await?;
  Ok(Json(records))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/{id}`
pub async fn get_one<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Record>, ApiError> {
  let record = service
    .get_record(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record))
}

/// `GET /records/matched/{id}`
pub async fn get_by_matched_id<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Path(matched_id): Path<Uuid>,
) -> Result<Json<Record>, ApiError> {
  let record = service
    .get_record_by_matched_id(matched_id)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no ACTUAL record with matched id {matched_id}"))
    })?;
  Ok(Json(record))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /records/{id}`
pub async fn delete_one<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Context(ctx): Context,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  service.delete_record(&ctx, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
