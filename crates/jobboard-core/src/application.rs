//! Job applications and the recruiter-driven status pipeline.
//!
//! Recruiters move an application's actual status around freely; the
//! applicant only sees a status once the recruiter chooses to notify them.
//! That split is a [`Staged`] value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, Role},
  staged::Staged,
  store::{ApplicationQuery, JobBoardStore},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  #[default]
  Applied,
  Review,
  Interview,
  Offer,
  Closed,
  Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
  pub application_id:    Uuid,
  pub job_id:            Uuid,
  pub applicant_id:      Uuid,
  pub cover_note:        Option<String>,
  pub status:            Staged<ApplicationStatus>,
  pub rejection_reason:  Option<String>,
  pub applied_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
  pub status_updated_at: DateTime<Utc>,
}

/// The applicant's view: only the published status, no recruiter notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantView {
  pub application_id: Uuid,
  pub job_id:         Uuid,
  pub status:         ApplicationStatus,
  pub applied_at:     DateTime<Utc>,
}

impl From<&JobApplication> for ApplicantView {
  fn from(a: &JobApplication) -> Self {
    Self {
      application_id: a.application_id,
      job_id:         a.job_id,
      status:         *a.status.published(),
      applied_at:     a.applied_at,
    }
  }
}

/// Input to [`JobBoardStore::add_application`].
#[derive(Debug, Clone)]
pub struct NewApplication {
  pub job_id:       Uuid,
  pub applicant_id: Uuid,
  pub cover_note:   Option<String>,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Load an application and check that `identity` owns the job it targets.
async fn owned_application<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
) -> Result<JobApplication> {
  identity.require_role(Role::Recruiter)?;
  let application = store
    .get_application(application_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("application", application_id))?;
  let job = store
    .get_job(application.job_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("job", application.job_id))?;
  identity.require_owner(job.recruiter_id, "application")?;
  Ok(application)
}

/// Apply to an active job as a job seeker. Applying twice is a conflict.
pub async fn apply_to_job<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  job_id: Uuid,
  cover_note: Option<String>,
) -> Result<JobApplication> {
  identity.require_role(Role::JobSeeker)?;
  let job = store
    .get_job(job_id)
    .await
    .map_err(Error::store)?
    .filter(|j| j.is_active)
    .ok_or_else(|| Error::not_found("job", job_id))?;

  let cover_note = cover_note
    .map(|n| n.trim().to_owned())
    .filter(|n| !n.is_empty());
  store
    .add_application(NewApplication {
      job_id: job.job_id,
      applicant_id: identity.user_id,
      cover_note,
    })
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::Conflict(format!("already applied to job {job_id}")))
}

/// Set an application's status; with `notify` the applicant sees it at once.
pub async fn update_application_status<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
  status: ApplicationStatus,
  notify: bool,
  now: DateTime<Utc>,
) -> Result<JobApplication> {
  let mut application = owned_application(store, identity, application_id).await?;
  application.status.set(status, notify);
  application.status_updated_at = now;
  application.updated_at = now;
  store.save_application(&application).await.map_err(Error::store)?;
  info!(%application_id, %status, notify, "application status updated");
  Ok(application)
}

/// Publish the current status of each listed application. Applications the
/// recruiter does not own are skipped. Returns how many statuses changed
/// for the applicant; already-published ones do not count.
pub async fn publish_statuses<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_ids: &[Uuid],
  now: DateTime<Utc>,
) -> Result<usize> {
  let mut published = 0;
  for &id in application_ids {
    let mut application = match owned_application(store, identity, id).await {
      Ok(a) => a,
      Err(Error::Unauthorized(_) | Error::NotFound { .. }) => continue,
      Err(e) => return Err(e),
    };
    if application.status.promote() {
      application.updated_at = now;
      store.save_application(&application).await.map_err(Error::store)?;
      published += 1;
    }
  }
  Ok(published)
}

/// Reject an application with a reason; rejection is always published.
pub async fn reject_application<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
  reason: Option<String>,
  now: DateTime<Utc>,
) -> Result<JobApplication> {
  let mut application = owned_application(store, identity, application_id).await?;
  application.status.set(ApplicationStatus::Rejected, true);
  application.rejection_reason = reason.filter(|r| !r.trim().is_empty());
  application.status_updated_at = now;
  application.updated_at = now;
  store.save_application(&application).await.map_err(Error::store)?;
  Ok(application)
}

/// All applications to a job, for its owner.
pub async fn applications_for_job<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  job_id: Uuid,
) -> Result<Vec<JobApplication>> {
  let job = store
    .get_job(job_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("job", job_id))?;
  identity.require_owner(job.recruiter_id, "job")?;
  store
    .list_applications(&ApplicationQuery { job_id: Some(job_id), applicant_id: None })
    .await
    .map_err(Error::store)
}

/// The requester's own applications, showing published statuses only.
pub async fn my_applications<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
) -> Result<Vec<ApplicantView>> {
  identity.require_role(Role::JobSeeker)?;
  let applications = store
    .list_applications(&ApplicationQuery {
      job_id:       None,
      applicant_id: Some(identity.user_id),
    })
    .await
    .map_err(Error::store)?;
  Ok(applications.iter().map(ApplicantView::from).collect())
}
