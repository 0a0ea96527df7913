//! Batch ingestion engine for source records.
//!
//! [`RecordService`] is the operation surface: snapshot lifecycle, single and
//! batch record creation, batch parsed-content replacement, typed listing and
//! the test-mode bulk loader. It is generic over any
//! [`srs_core::store::SourceStorage`] backend.

pub mod batch;
pub mod config;
pub mod error;
mod service;

pub use batch::{BatchError, BatchResult};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use service::RecordService;
