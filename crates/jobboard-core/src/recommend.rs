//! Candidate ranking for a job, and job ranking for a candidate.

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, Role},
  job::JobPosting,
  matcher::{Scored, overlap, rank, shared},
  profile::{CandidateProfile, ProfileField, excerpt},
  store::{JobBoardStore, ProfileQuery},
  tokenize::{TokenSet, tokenize},
};

/// Characters of the skills field shown next to each recommended candidate.
pub const SKILL_EXCERPT_LEN: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
  pub profile:        CandidateProfile,
  pub overlap:        usize,
  pub matched_skills: Vec<String>,
  pub skill_excerpt:  String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
  pub job:            JobPosting,
  pub overlap:        usize,
  pub matched_skills: Vec<String>,
}

/// The tokens a job is matched on: its own requirements plus the posting
/// recruiter's profile skills, the latter only when they are visible.
pub fn effective_job_skills(
  job: &JobPosting,
  recruiter_profile: Option<&CandidateProfile>,
) -> TokenSet {
  let mut skills = tokenize(&job.skills_required);
  if let Some(text) =
    recruiter_profile.and_then(|p| p.visible_field(ProfileField::Skills))
  {
    skills.extend(tokenize(text));
  }
  skills
}

/// Rank `pool` against `job_skills`. Profiles with hidden or empty skills,
/// and the profile of `exclude_user`, never appear. Returned profiles are
/// redacted.
pub fn rank_candidates(
  job_skills: &TokenSet,
  pool: Vec<CandidateProfile>,
  exclude_user: Option<Uuid>,
) -> Vec<CandidateMatch> {
  let scored = pool
    .into_iter()
    .filter(|p| Some(p.user_id) != exclude_user)
    .filter_map(|p| {
      let tokens = tokenize(p.visible_field(ProfileField::Skills)?);
      let n = overlap(job_skills, &tokens);
      let matched = shared(job_skills, &tokens);
      Some(Scored {
        overlap:    n,
        updated_at: p.updated_at,
        id:         p.profile_id,
        item:       (p, matched),
      })
    });

  rank(scored)
    .into_iter()
    .map(|s| {
      let (profile, matched_skills) = s.item;
      CandidateMatch {
        skill_excerpt: excerpt(&profile.skills, SKILL_EXCERPT_LEN),
        profile: profile.redacted(),
        overlap: s.overlap,
        matched_skills,
      }
    })
    .collect()
}

/// Rank active `jobs` against a candidate's skill tokens.
pub fn rank_jobs(candidate_skills: &TokenSet, jobs: Vec<JobPosting>) -> Vec<JobMatch> {
  let scored = jobs.into_iter().filter(|j| j.is_active).map(|job| {
    let tokens = tokenize(&job.skills_required);
    Scored {
      overlap:    overlap(candidate_skills, &tokens),
      updated_at: job.updated_at,
      id:         job.job_id,
      item:       (shared(candidate_skills, &tokens), job),
    }
  });

  rank(scored)
    .into_iter()
    .map(|s| {
      let (matched_skills, job) = s.item;
      JobMatch { job, overlap: s.overlap, matched_skills }
    })
    .collect()
}

/// Candidates for `job_id`, best match first. Only the job's own recruiter
/// may ask; anyone else is refused rather than given an empty list.
pub async fn recommend_candidates<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  job_id: Uuid,
) -> Result<Vec<CandidateMatch>> {
  let job = store
    .get_job(job_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("job", job_id))?;
  identity.require_role(Role::Recruiter)?;
  identity.require_owner(job.recruiter_id, "job")?;

  let recruiter_profile = store
    .get_profile_by_user(job.recruiter_id)
    .await
    .map_err(Error::store)?;
  let job_skills = effective_job_skills(&job, recruiter_profile.as_ref());

  let pool = store
    .list_profiles(&ProfileQuery::default())
    .await
    .map_err(Error::store)?;
  Ok(rank_candidates(&job_skills, pool, Some(job.recruiter_id)))
}

/// Active jobs for the requesting job seeker, best match first.
pub async fn recommend_jobs<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
) -> Result<Vec<JobMatch>> {
  identity.require_role(Role::JobSeeker)?;
  let profile = store
    .get_profile_by_user(identity.user_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("profile", identity.user_id))?;

  let jobs = store.list_jobs(true).await.map_err(Error::store)?;
  Ok(rank_jobs(&tokenize(&profile.skills), jobs))
}
