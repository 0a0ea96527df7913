//! Request context extraction from the `x-okapi-*` headers.

use axum::{extract::FromRequestParts, http::request::Parts};
use srs_core::context::RequestContext;
use uuid::Uuid;

use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-okapi-tenant";
pub const USER_ID_HEADER: &str = "x-okapi-user-id";

/// Tenant used when the caller sends none.
const DEFAULT_TENANT: &str = "default";

/// Extractor wrapping the [`RequestContext`] of a request.
///
/// A missing user header is allowed; a malformed one is rejected.
#[derive(Debug, Clone)]
pub struct Context(pub RequestContext);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
  parts
    .headers
    .get(name)
    .map(|v| {
      v.to_str()
        .map_err(|_| ApiError::BadRequest(format!("{name} is not valid ASCII")))
    })
    .transpose()
}

impl<S: Send + Sync> FromRequestParts<S> for Context {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let tenant = header(parts, TENANT_HEADER)?.unwrap_or(DEFAULT_TENANT);
    let user_id = header(parts, USER_ID_HEADER)?
      .filter(|v| !v.is_empty())
      .map(|v| {
        Uuid::parse_str(v).map_err(|_| {
          ApiError::BadRequest(format!("{USER_ID_HEADER} is not a UUID: {v:?}"))
        })
      })
      .transpose()?;
    Ok(Context(RequestContext::new(tenant, user_id)))
  }
}
