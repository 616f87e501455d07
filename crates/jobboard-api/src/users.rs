//! Handlers for `/users` and `/me`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: [`NewUserBody`]; returns 201 + the user |
//! | `GET`  | `/me` | The requesting user |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jobboard_core::{
  Error as CoreError,
  identity::{NewUser, Role, User},
  notify::Notifier,
  store::JobBoardStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NewUserBody {
  pub role:         Role,
  pub display_name: String,
  pub email:        String,
}

/// `POST /users`
pub async fn create<S, N>(
  State(state): State<ApiState<S, N>>,
  Json(body): Json<NewUserBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let display_name = body.display_name.trim().to_owned();
  let email = body.email.trim().to_owned();
  if display_name.is_empty() || !email.contains('@') {
    return Err(ApiError::BadRequest(
      "display_name and a valid email are required".into(),
    ));
  }

  let user = state
    .store
    .add_user(NewUser { role: body.role, display_name, email })
    .await
    .map_err(CoreError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> { Json(user) }
