//! Handlers for `/applications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications` | Job seeker's own; published statuses only |
//! | `PUT`  | `/applications/{id}/status` | Owning recruiter; body: [`StatusBody`] |
//! | `POST` | `/applications/publish` | Body: `{"application_ids":[...]}` |
//! | `POST` | `/applications/{id}/reject` | Body: `{"reason":"..."}` |

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use jobboard_core::{
  application::{
    ApplicantView, ApplicationStatus, JobApplication, my_applications, publish_statuses,
    reject_application, update_application_status,
  },
  notify::Notifier,
  store::JobBoardStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

/// `GET /applications`
pub async fn mine<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<Vec<ApplicantView>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(my_applications(&*state.store, &user.identity()).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: ApplicationStatus,
  /// Show the new status to the applicant right away.
  #[serde(default)]
  pub notify: bool,
}

/// `PUT /applications/{id}/status`
pub async fn set_status<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<JobApplication>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let application = update_application_status(
    &*state.store,
    &user.identity(),
    id,
    body.status,
    body.notify,
    Utc::now(),
  )
  .await?;
  Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
  pub application_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
  pub published: usize,
}

/// `POST /applications/publish`
pub async fn publish<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Json(body): Json<PublishBody>,
) -> Result<Json<PublishResponse>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let published =
    publish_statuses(&*state.store, &user.identity(), &body.application_ids, Utc::now())
      .await?;
  Ok(Json(PublishResponse { published }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
  pub reason: Option<String>,
}

/// `POST /applications/{id}/reject`
pub async fn reject<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<JobApplication>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let application =
    reject_application(&*state.store, &user.identity(), id, body.reason, Utc::now()).await?;
  Ok(Json(application))
}
