//! Handlers for application message threads. Participants only: the
//! applicant and the recruiter who owns the job.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications/{id}/messages` | Marks the other side's messages read |
//! | `POST` | `/applications/{id}/messages` | Body: `{"content":"..."}`; returns 201 |
//! | `GET`  | `/messages/unread` | `{"unread_count": n}` |
//! | `GET`  | `/conversations` | Threads with messages, most recent first |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use jobboard_core::{
  messaging::{Conversation, Thread, conversations, open_thread, send_message, unread_message_count},
  notify::Notifier,
  store::JobBoardStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

/// `GET /applications/{id}/messages`
pub async fn thread<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Thread>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(open_thread(&*state.store, &user.identity(), id).await?))
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub content: String,
}

/// `POST /applications/{id}/messages`
pub async fn send<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<MessageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let message = send_message(&*state.store, &user.identity(), id, &body.content).await?;
  Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
  pub unread_count: usize,
}

/// `GET /messages/unread`
pub async fn unread<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<UnreadResponse>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let unread_count = unread_message_count(&*state.store, &user.identity()).await?;
  Ok(Json(UnreadResponse { unread_count }))
}

/// `GET /conversations`
pub async fn inbox<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<Vec<Conversation>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(conversations(&*state.store, &user.identity()).await?))
}
