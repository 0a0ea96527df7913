//! Per-request identity supplied by the caller.

use uuid::Uuid;

/// The identity recorded in metadata when the request carries no user.
pub const SYSTEM_USER_ID: Uuid = Uuid::nil();

/// Tenant and acting user for one request. Treated as opaque input; the
/// engine never authenticates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
  pub tenant_id: String,
  pub user_id:   Option<Uuid>,
}

impl RequestContext {
  pub fn new(tenant_id: impl Into<String>, user_id: Option<Uuid>) -> Self {
    Self { tenant_id: tenant_id.into(), user_id }
  }

  /// The user to stamp into `created_by` / `updated_by`.
  pub fn actor(&self) -> Uuid { self.user_id.unwrap_or(SYSTEM_USER_ID) }
}

impl Default for RequestContext {
  fn default() -> Self { Self::new("default", None) }
}
