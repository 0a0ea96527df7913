//! Server wiring for source-record storage: configuration and the top-level
//! router.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use srs_core::store::SourceStorage;
use srs_engine::{EngineConfig, RecordService};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8081 }

fn default_store_path() -> PathBuf { PathBuf::from("srs.sqlite3") }

/// Runtime server configuration, deserialised from `config.toml` and
/// `SRS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<S>(service: Arc<RecordService<S>>) -> Router
where
  S: SourceStorage + 'static,
{
  srs_api::api_router(service).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use srs_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn load(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = load("");
    assert_eq!(cfg.address(), "127.0.0.1:8081");
    assert!(!cfg.engine.test_mode);
    assert_eq!(cfg.engine.batch_concurrency, 16);
  }

  #[test]
  fn test_mode_is_read_from_engine_table() {
    let cfg = load(
      "port = 9130\nstore_path = \"/tmp/srs.db\"\n[engine]\ntest_mode = true\n",
    );
    assert_eq!(cfg.port, 9130);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/srs.db"));
    assert!(cfg.engine.test_mode);
  }

  #[tokio::test]
  async fn router_serves_api_routes() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let service = Arc::new(RecordService::new(Arc::new(store), EngineConfig::default()));
    let req = Request::builder()
      .uri("/records")
      .body(Body::empty())
      .unwrap();
    let resp = router(service).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
