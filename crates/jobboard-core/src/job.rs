//! Job postings, salary ranges, coordinates, and the public job-list filters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

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
pub enum WorkMode {
  Remote,
  #[default]
  OnSite,
  Hybrid,
}

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
pub enum ExperienceLevel {
  #[default]
  Entry,
  Mid,
  Senior,
  Executive,
}

// ─── Salary ──────────────────────────────────────────────────────────────────

/// Optional yearly salary bounds. When both are present, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalaryRange {
  pub min: Option<u32>,
  pub max: Option<u32>,
}

impl SalaryRange {
  pub fn validate(&self) -> Result<()> {
    match (self.min, self.max) {
      (Some(min), Some(max)) if min > max => Err(Error::Validation(
        "minimum salary cannot be greater than maximum salary".into(),
      )),
      _ => Ok(()),
    }
  }
}

fn dollars(amount: u32) -> String {
  let digits = amount.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
  out.push('$');
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

impl fmt::Display for SalaryRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.min, self.max) {
      (Some(min), Some(max)) => write!(f, "{} - {}", dollars(min), dollars(max)),
      (Some(min), None) => write!(f, "{}+", dollars(min)),
      (None, Some(max)) => write!(f, "Up to {}", dollars(max)),
      (None, None) => f.write_str("Salary not specified"),
    }
  }
}

// ─── Coordinates ─────────────────────────────────────────────────────────────

/// A WGS 84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

/// Mean Earth radius used by [`GeoPoint::distance_km`].
const EARTH_RADIUS_KM: f64 = 6371.0088;

impl GeoPoint {
  pub fn validate(&self) -> Result<()> {
    if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
      return Err(Error::Validation(format!(
        "coordinates out of range: {}, {}",
        self.lat, self.lng
      )));
    }
    Ok(())
  }

  /// Great-circle (haversine) distance in kilometres.
  pub fn distance_km(&self, other: &GeoPoint) -> f64 {
    let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (other.lng - self.lng).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
  }
}

// ─── JobPosting ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
  pub job_id:           Uuid,
  /// The recruiter who owns this posting.
  pub recruiter_id:     Uuid,
  pub title:            String,
  pub company:          String,
  pub description:      String,
  /// Free text, usually comma-separated.
  pub skills_required:  String,
  pub location:         Option<String>,
  pub coordinates:      Option<GeoPoint>,
  pub salary:           SalaryRange,
  pub work_mode:        WorkMode,
  pub experience_level: ExperienceLevel,
  pub visa_sponsorship: bool,
  pub is_active:        bool,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

/// Input to [`crate::store::JobBoardStore::add_job`] and
/// [`crate::store::JobBoardStore::update_job`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJob {
  pub title:            String,
  pub company:          String,
  #[serde(default)]
  pub description:      String,
  pub skills_required:  String,
  pub location:         Option<String>,
  #[serde(default)]
  pub coordinates:      Option<GeoPoint>,
  #[serde(default)]
  pub salary:           SalaryRange,
  #[serde(default)]
  pub work_mode:        WorkMode,
  #[serde(default)]
  pub experience_level: ExperienceLevel,
  #[serde(default)]
  pub visa_sponsorship: bool,
}

impl NewJob {
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("title", &self.title),
      ("company", &self.company),
      ("skills_required", &self.skills_required),
    ] {
      if value.trim().is_empty() {
        return Err(Error::Validation(format!("{name} is required")));
      }
    }
    if let Some(point) = &self.coordinates {
      point.validate()?;
    }
    self.salary.validate()
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Public job-list filters. Every set field must match; inactive jobs never
/// match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
  /// Case-insensitive substring of title, company, skills or description.
  pub text:             Option<String>,
  pub location:         Option<String>,
  pub work_mode:        Option<WorkMode>,
  /// Only `Some(true)` narrows the results.
  pub visa_sponsorship: Option<bool>,
  /// Job's minimum salary must be at least this.
  pub salary_min:       Option<u32>,
  /// Job's maximum salary must be at most this.
  pub salary_max:       Option<u32>,
  pub experience_level: Option<ExperienceLevel>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_blank(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl JobFilter {
  pub fn matches(&self, job: &JobPosting) -> bool {
    if !job.is_active {
      return false;
    }
    if let Some(text) = non_blank(&self.text)
      && ![
        &job.title,
        &job.company,
        &job.skills_required,
        &job.description,
      ]
      .iter()
      .any(|field| contains_ci(field, text))
    {
      return false;
    }
    if let Some(location) = non_blank(&self.location)
      && !job
        .location
        .as_deref()
        .is_some_and(|l| contains_ci(l, location))
    {
      return false;
    }
    if self.work_mode.is_some_and(|m| m != job.work_mode) {
      return false;
    }
    if self.visa_sponsorship == Some(true) && !job.visa_sponsorship {
      return false;
    }
    if let Some(floor) = self.salary_min
      && !job.salary.min.is_some_and(|m| m >= floor)
    {
      return false;
    }
    if let Some(ceiling) = self.salary_max
      && !job.salary.max.is_some_and(|m| m <= ceiling)
    {
      return false;
    }
    if self.experience_level.is_some_and(|l| l != job.experience_level) {
      return false;
    }
    true
  }

  /// Apply the filter, newest postings first.
  pub fn apply(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
    let mut out: Vec<_> = jobs.into_iter().filter(|j| self.matches(j)).collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
  }
}

// ─── Geographic search ───────────────────────────────────────────────────────

/// Query for [`nearby_jobs`]. The origin only counts when both coordinates
/// are given.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GeoQuery {
  pub lat:             Option<f64>,
  pub lng:             Option<f64>,
  pub max_distance_km: Option<f64>,
}

impl GeoQuery {
  fn origin(&self) -> Option<GeoPoint> {
    Some(GeoPoint { lat: self.lat?, lng: self.lng? })
  }
}

/// A located job and, when an origin was given, how far away it is.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyJob {
  #[serde(flatten)]
  pub job:         JobPosting,
  /// Rounded to two decimals.
  pub distance_km: Option<f64>,
}

/// Active jobs that have coordinates. With an origin, each carries its
/// distance, those beyond `max_distance_km` are dropped, and the nearest come
/// first; otherwise the order is newest first.
pub fn nearby_jobs(jobs: Vec<JobPosting>, query: &GeoQuery) -> Vec<NearbyJob> {
  let origin = query.origin();
  let mut out: Vec<NearbyJob> = jobs
    .into_iter()
    .filter(|j| j.is_active)
    .filter_map(|job| {
      let at = job.coordinates?;
      let distance_km = origin.map(|o| (o.distance_km(&at) * 100.0).round() / 100.0);
      if let (Some(d), Some(max)) = (distance_km, query.max_distance_km)
        && d > max
      {
        return None;
      }
      Some(NearbyJob { job, distance_km })
    })
    .collect();
  if origin.is_some() {
    out.sort_by(|a, b| {
      a.distance_km
        .partial_cmp(&b.distance_km)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.job.job_id.cmp(&b.job.job_id))
    });
  } else {
    out.sort_by(|a, b| b.job.created_at.cmp(&a.job.created_at));
  }
  out
}
