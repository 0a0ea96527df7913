//! Handler for `/source-records`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/source-records` | Typed filters, see [`SourceListParams`]; `?query=` is rejected with 501 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use srs_core::{
  query::{OrderBy, RecordField, RecordFilter, RecordQuery, SortDirection},
  record::{RecordType, SourceRecordCollection},
  store::SourceStorage,
};
use srs_engine::RecordService;
use uuid::Uuid;

use crate::error::ApiError;

/// Query parameters for `GET /source-records`.
///
/// Only `ACTUAL` records are listed unless `deleted=true`, which adds the
/// `DELETED` ones.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceListParams {
  /// Free-text query; no longer supported.
  pub query:              Option<String>,
  pub snapshot_id:        Option<Uuid>,
  pub record_type:        Option<RecordType>,
  pub suppress_discovery: Option<bool>,
  pub instance_id:        Option<Uuid>,
  #[serde(default)]
  pub deleted:            bool,
  pub order_by:           Option<RecordField>,
  #[serde(default)]
  pub direction:          SortDirection,
  #[serde(default)]
  pub offset:             usize,
  pub limit:              Option<usize>,
}

impl SourceListParams {
  fn into_query(self) -> RecordQuery {
    let filter = [
      self.snapshot_id.map(RecordFilter::SnapshotId),
      self.record_type.map(RecordFilter::RecordType),
      self.suppress_discovery.map(RecordFilter::SuppressDiscovery),
      self.instance_id.map(RecordFilter::InstanceId),
    ]
    .into_iter()
    .flatten()
    .fold(RecordFilter::source_records(self.deleted), RecordFilter::and);

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

/// `GET /source-records`
pub async fn list<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Query(params): Query<SourceListParams>,
) -> Result<Json<SourceRecordCollection>, ApiError> {
  if let Some(text) = &params.query {
    let records = service.list_source_records_by_query_string(text).await?;
    return Ok(Json(records));
  }
  let records = service.list_source_records(&params.into_query()).await?;
  Ok(Json(records))
}
