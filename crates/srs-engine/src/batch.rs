//! Batch results and the fan-out/fan-in join behind every batch operation.

use std::future::Future;

use futures::stream::{self, StreamExt as _};
use serde::Serialize;
use srs_core::DomainError;
use uuid::Uuid;

use crate::{Error, Result};

/// One item of a batch that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
  /// Position of the item in the submitted batch.
  pub index:     usize,
  /// The id the item referred to, when it carried one.
  pub reference: Option<Uuid>,
  pub message:   String,
}

/// Outcome of a batch call: successes in input order, errors in the order
/// they were detected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
  pub succeeded: Vec<T>,
  pub errors:    Vec<BatchError>,
}

impl<T> BatchResult<T> {
  /// Every item failed.
  pub fn is_failure(&self) -> bool {
    !self.errors.is_empty() && self.succeeded.is_empty()
  }
}

/// A store call for the item at `index`.
pub(crate) struct Job<F> {
  pub index:     usize,
  pub reference: Option<Uuid>,
  pub call:      F,
}

/// Run `jobs` with at most `concurrency` in flight and join the outcomes.
///
/// `errors` holds failures already detected before any store call; they stay
/// ahead of store failures. Domain failures become per-item errors. If
/// nothing succeeded and every failure came from the backend itself, the
/// first backend failure is returned for the whole call.
pub(crate) async fn fan_out<T, E, F>(
  jobs: Vec<Job<F>>,
  concurrency: usize,
  mut errors: Vec<BatchError>,
) -> Result<BatchResult<T>>
where
  F: Future<Output = Result<T, E>>,
  E: DomainError + std::error::Error + Send + Sync + 'static,
{
  let mut outcomes = stream::iter(jobs.into_iter().map(|job| async move {
    (job.index, job.reference, job.call.await)
  }))
  .buffer_unordered(concurrency.max(1));

  let mut succeeded = Vec::new();
  let mut domain_failures = !errors.is_empty();
  let mut backend_failure = None;

  while let Some((index, reference, outcome)) = outcomes.next().await {
    match outcome {
      Ok(value) => succeeded.push((index, value)),
      Err(err) => {
        let message = match err.into_domain() {
          Ok(domain) => {
            domain_failures = true;
            tracing::warn!(index, ?reference, error = %domain, "batch item rejected");
            domain.to_string()
          }
          Err(backend) => {
            tracing::error!(index, ?reference, error = %backend, "batch item failed");
            let message = backend.to_string();
            backend_failure.get_or_insert(backend);
            message
          }
        };
        errors.push(BatchError { index, reference, message });
      }
    }
  }

  if succeeded.is_empty() && !domain_failures {
    if let Some(backend) = backend_failure {
      return Err(Error::Store(Box::new(backend)));
    }
  }

  succeeded.sort_by_key(|(index, _)| *index);
  Ok(BatchResult {
    succeeded: succeeded.into_iter().map(|(_, value)| value).collect(),
    errors,
  })
}
