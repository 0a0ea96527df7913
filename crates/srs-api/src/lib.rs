//! JSON REST API for source-record storage.
//!
//! Exposes an axum [`Router`] backed by a [`RecordService`] over any
//! [`srs_core::store::SourceStorage`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/source-storage", srs_api::api_router(service.clone()))
//! ```

pub mod batch;
pub mod context;
pub mod error;
pub mod records;
pub mod snapshots;
pub mod source_records;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use srs_core::store::SourceStorage;
use srs_engine::RecordService;

pub use context::Context;
pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<RecordService<S>>) -> Router<()>
where
  S: SourceStorage + 'static,
{
  Router::new()
    // Snapshots
    .route("/snapshots", post(snapshots::create::<S>))
    .route(
      "/snapshots/{id}",
      get(snapshots::get_one::<S>).put(snapshots::update_status::<S>),
    )
    // Records
    .route("/records", get(records::list::<S>).post(records::create::<S>))
    .route(
      "/records/{id}",
      get(records::get_one::<S>).delete(records::delete_one::<S>),
    )
    .route("/records/matched/{id}", get(records::get_by_matched_id::<S>))
    // Source records
    .route("/source-records", get(source_records::list::<S>))
    // Batches
    .route("/batch/records", post(batch::create_records::<S>))
    .route("/batch/parsed-records", put(batch::update_parsed_records::<S>))
    .route("/populate-test-records", post(batch::populate_test_records::<S>))
    .with_state(service)
}
