//! Engine configuration, injected at construction.

use serde::Deserialize;

fn default_batch_concurrency() -> usize { 16 }

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Enables maintenance operations such as the bulk test loader.
  #[serde(default)]
  pub test_mode:         bool,
  /// Upper bound on in-flight store calls per batch.
  #[serde(default = "default_batch_concurrency")]
  pub batch_concurrency: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      test_mode:         false,
      batch_concurrency: default_batch_concurrency(),
    }
  }
}

impl EngineConfig {
  pub fn test_mode() -> Self { Self { test_mode: true, ..Self::default() } }
}
