//! Resolves the requester from the `x-user-id` header.
//!
//! Authentication proper (sessions, tokens) sits in front of this service;
//! by the time a request arrives the header names an existing user.

use axum::{extract::FromRequestParts, http::request::Parts};
use jobboard_core::{
  Error as CoreError,
  identity::{Identity, User},
  notify::Notifier,
  store::JobBoardStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

pub const USER_HEADER: &str = "x-user-id";

/// The authenticated user. Present in a handler means the header named a
/// known user.
pub struct CurrentUser(pub User);

impl CurrentUser {
  pub fn identity(&self) -> Identity { self.0.identity() }
}

impl<S, N> FromRequestParts<ApiState<S, N>> for CurrentUser
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, N>,
  ) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| ApiError::Unauthenticated(format!("missing {USER_HEADER} header")))?;
    let user_id = Uuid::parse_str(raw.trim())
      .map_err(|_| ApiError::Unauthenticated(format!("malformed {USER_HEADER} header")))?;

    let user = state
      .store
      .get_user(user_id)
      .await
      .map_err(CoreError::store)?
      .ok_or_else(|| ApiError::Unauthenticated(format!("unknown user {user_id}")))?;
    Ok(CurrentUser(user))
  }
}
