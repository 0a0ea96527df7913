//! Handlers for `/snapshots` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/snapshots` | Body: `{"snapshotId":"…","status":"PARSING_IN_PROGRESS"}` |
//! | `GET`  | `/snapshots/{id}` | 404 if not found |
//! | `PUT`  | `/snapshots/{id}` | Body: `{"status":"COMMITTED"}`; 404 if not found, 409 on a backward move |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use srs_core::{
  snapshot::{NewSnapshot, Snapshot, SnapshotStatus},
  store::SourceStorage,
};
use srs_engine::RecordService;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /snapshots`
pub async fn create<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Json(body): Json<NewSnapshot>,
) -> Result<impl IntoResponse, ApiError> {
  let snapshot = service.create_snapshot(body).await?;
  Ok((StatusCode::CREATED, Json(snapshot)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /snapshots/{id}`
pub async fn get_one<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Snapshot>, ApiError> {
  let snapshot = service
    .get_snapshot(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("snapshot {id} not found")))?;
  Ok(Json(snapshot))
}

// ─── Update status ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: SnapshotStatus,
}

/// `PUT /snapshots/{id}`
pub async fn update_status<S: SourceStorage>(
  State(service): State<Arc<RecordService<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Snapshot>, ApiError> {
  let snapshot = service.update_snapshot_status(id, body.status).await?;
  Ok(Json(snapshot))
}
