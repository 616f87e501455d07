//! Handlers for `/profile` and `/profiles/{id}`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/profile` | The requester's own profile, unredacted |
//! | `PUT`  | `/profile` | Body: [`ProfileInput`]; create or overwrite |
//! | `GET`  | `/profiles/{id}` | Redacted unless the requester owns it |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use jobboard_core::{
  Error as CoreError,
  identity::Role,
  notify::{Notifier, notify_on_profile_change},
  profile::{CandidateProfile, ProfileInput},
  store::JobBoardStore,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

/// `GET /profile`
pub async fn get_mine<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<CandidateProfile>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let user_id = user.0.user_id;
  let profile = state
    .store
    .get_profile_by_user(user_id)
    .await
    .map_err(CoreError::store)?
    .ok_or_else(|| CoreError::not_found("profile", user_id))?;
  Ok(Json(profile))
}

/// `PUT /profile`
///
/// Saving a job seeker's profile immediately tells the owners of matching
/// saved searches. A failure there is logged; the save itself stands.
pub async fn put_mine<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Json(input): Json<ProfileInput>,
) -> Result<Json<CandidateProfile>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let input = input.validate()?;
  let profile = state
    .store
    .upsert_profile(user.0.user_id, input)
    .await
    .map_err(CoreError::store)?;

  if user.0.role == Role::JobSeeker {
    let profile_id = profile.profile_id;
    match notify_on_profile_change(&*state.store, &*state.notifier, profile_id, Utc::now())
      .await
    {
      Ok(0) => {}
      Ok(created) => info!(%profile_id, created, "saved search owners notified"),
      Err(e) => warn!(%profile_id, error = %e, "profile change notifications failed"),
    }
  }

  Ok(Json(profile))
}

/// `GET /profiles/{id}`
pub async fn get_one<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<CandidateProfile>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let profile = state
    .store
    .get_profile(id)
    .await
    .map_err(CoreError::store)?
    .ok_or_else(|| CoreError::not_found("profile", id))?;

  if profile.user_id == user.0.user_id {
    Ok(Json(profile))
  } else {
    Ok(Json(profile.redacted()))
  }
}
