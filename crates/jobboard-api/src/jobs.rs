//! Handlers for `/jobs` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/jobs` | Public; query maps to [`JobFilter`] |
//! | `POST`   | `/jobs` | Recruiter; body: [`NewJob`]; returns 201 |
//! | `GET`    | `/jobs/geo` | Public; located jobs, query maps to [`GeoQuery`] |
//! | `GET`    | `/jobs/{id}` | Public |
//! | `PUT`    | `/jobs/{id}` | Owner; body: [`UpdateJobBody`] |
//! | `DELETE` | `/jobs/{id}` | Owner; returns 204 |
//! | `GET`    | `/jobs/{id}/candidates` | Owner; ranked candidates |
//! | `POST`   | `/jobs/{id}/apply` | Job seeker; body: `{"cover_note":"..."}` |
//! | `GET`    | `/jobs/{id}/applications` | Owner |
//! | `GET`    | `/recommendations/jobs` | Job seeker; ranked active jobs |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use jobboard_core::{
  Error as CoreError,
  application::{JobApplication, applications_for_job, apply_to_job},
  identity::{Identity, Role},
  job::{GeoQuery, JobFilter, JobPosting, NearbyJob, NewJob, nearby_jobs},
  notify::Notifier,
  recommend::{CandidateMatch, JobMatch, recommend_candidates, recommend_jobs},
  store::JobBoardStore,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, identity::CurrentUser};

async fn owned_job<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  id: Uuid,
) -> Result<JobPosting, ApiError> {
  identity.require_role(Role::Recruiter)?;
  let job = store
    .get_job(id)
    .await
    .map_err(CoreError::store)?
    .ok_or_else(|| CoreError::not_found("job", id))?;
  identity.require_owner(job.recruiter_id, "job")?;
  Ok(job)
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// `GET /jobs[?text=...][&location=...][&work_mode=...][&salary_min=...]...`
pub async fn list<S, N>(
  State(state): State<ApiState<S, N>>,
  Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<JobPosting>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let jobs = state.store.list_jobs(true).await.map_err(CoreError::store)?;
  Ok(Json(filter.apply(jobs)))
}

/// `GET /jobs/geo[?lat=...&lng=...][&max_distance_km=...]`
pub async fn geo<S, N>(
  State(state): State<ApiState<S, N>>,
  Query(query): Query<GeoQuery>,
) -> Result<Json<Vec<NearbyJob>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let jobs = state.store.list_jobs(true).await.map_err(CoreError::store)?;
  Ok(Json(nearby_jobs(jobs, &query)))
}

/// `GET /jobs/{id}`
pub async fn get_one<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<JobPosting>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let job = state
    .store
    .get_job(id)
    .await
    .map_err(CoreError::store)?
    .ok_or_else(|| CoreError::not_found("job", id))?;
  Ok(Json(job))
}

// ─── Management ──────────────────────────────────────────────────────────────

/// `POST /jobs`
pub async fn create<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Json(body): Json<NewJob>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  user.identity().require_role(Role::Recruiter)?;
  body.validate()?;
  let job = state
    .store
    .add_job(user.0.user_id, body)
    .await
    .map_err(CoreError::store)?;
  info!(job_id = %job.job_id, recruiter_id = %job.recruiter_id, "job posted");
  Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobBody {
  #[serde(flatten)]
  pub job:       NewJob,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool { true }

/// `PUT /jobs/{id}`
pub async fn update<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateJobBody>,
) -> Result<Json<JobPosting>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  owned_job(&*state.store, &user.identity(), id).await?;
  body.job.validate()?;
  let job = state
    .store
    .update_job(id, body.job, body.is_active)
    .await
    .map_err(CoreError::store)?
    .ok_or_else(|| CoreError::not_found("job", id))?;
  Ok(Json(job))
}

/// `DELETE /jobs/{id}`
pub async fn delete_one<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  owned_job(&*state.store, &user.identity(), id).await?;
  state.store.delete_job(id).await.map_err(CoreError::store)?;
  info!(job_id = %id, "job deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// `GET /jobs/{id}/candidates`
pub async fn candidates<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CandidateMatch>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let ranked = recommend_candidates(&*state.store, &user.identity(), id).await?;
  Ok(Json(ranked))
}

/// `GET /recommendations/jobs`
pub async fn recommended<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
) -> Result<Json<Vec<JobMatch>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let ranked = recommend_jobs(&*state.store, &user.identity()).await?;
  Ok(Json(ranked))
}

// ─── Applications ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ApplyBody {
  pub cover_note: Option<String>,
}

/// `POST /jobs/{id}/apply`
pub async fn apply<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<ApplyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let application = apply_to_job(&*state.store, &user.identity(), id, body.cover_note).await?;
  Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /jobs/{id}/applications`
pub async fn applications<S, N>(
  State(state): State<ApiState<S, N>>,
  user: CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobApplication>>, ApiError>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  let list = applications_for_job(&*state.store, &user.identity(), id).await?;
  Ok(Json(list))
}
