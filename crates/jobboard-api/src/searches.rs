//! Handlers for `/searches` endpoints. Recruiters only; every path below
//! `/searches/{id}` is owner-only.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/searches` | The requester's saved searches |
//! | `POST`   | `/searches` | Body: [`NewSearchBody`]; returns 201 |
//! | `GET`    | `/searches/{id}` | |
//! | `PUT`    | `/searches/{id}` | Body: [`SavedSearchUpdate`] |
//! | `DELETE` | `/searches/{id}` | Also drops its notification history; 204 |
//! | `GET`    | `/searches/{id}/results` | Run now; redacted profiles |
//! | `POST`   | `/searches/{id}/notify` | `?dry_run=true` to preview |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use jobboard_core::{
  notify::{NotificationReport, Notifier, NotifyOptions, process_notifications},
  profile::CandidateProfile,
  saved_search::{
    create_saved_search, delete_saved_search, get_saved_search, list_saved_searches,
    run_saved_search, update_saved_search,
  },
  search::{NewSavedSearch, SavedSearch, SavedSearchUpdate, SearchCriteria},
  store::JobBoardStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NewSearchBody {
  pub name:                 String,
  #[serde(flatten)]
  pub criteria:             SearchCriteria,
  #[serde(default = "default_true")]
  pub notification_enabled: bool,
}

fn default_true() -> bool { true }

/// `GET /searches`
pub async fn list<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<Vec<SavedSearch>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(list_saved_searches(&*state.store, &user.identity()).await?))
}

/// `POST /searches`
pub async fn create<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Json(body): Json<NewSearchBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let input = NewSavedSearch {
    recruiter_id:         user.0.user_id,
    name:                 body.name,
    criteria:             body.criteria,
    notification_enabled: body.notification_enabled,
  };
  let search = create_saved_search(&*state.store, &user.identity(), input).await?;
  Ok((StatusCode::CREATED, Json(search)))
}

/// `GET /searches/{id}`
pub async fn get_one<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<SavedSearch>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(get_saved_search(&*state.store, &user.identity(), id).await?))
}

/// `PUT /searches/{id}`
pub async fn update<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<SavedSearchUpdate>,
) -> Result<Json<SavedSearch>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(update_saved_search(&*state.store, &user.identity(), id, body).await?))
}

/// `DELETE /searches/{id}`
pub async fn delete_one<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  delete_saved_search(&*state.store, &user.identity(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /searches/{id}/results`
pub async fn results<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CandidateProfile>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Ok(Json(run_saved_search(&*state.store, &user.identity(), id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifyParams {
  #[serde(default)]
  pub dry_run: bool,
}

/// `POST /searches/{id}/notify[?dry_run=true]`
pub async fn notify<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Query(params): Query<NotifyParams>,
) -> Result<Json<NotificationReport>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  // Ownership check; the batch itself runs without an identity.
  get_saved_search(&*state.store, &user.identity(), id).await?;
  let options = NotifyOptions { now: Utc::now(), dry_run: params.dry_run };
  let report = process_notifications(&*state.store, &*state.notifier, id, options).await?;
  Ok(Json(report))
}
