//! Saved searches and the engine that evaluates them against profiles.
//!
//! Criteria are combined with AND across the non-blank fields. Within a
//! field, the listed terms are OR'd. Every predicate checks the matching
//! field's visibility bit first, so a hidden field never matches.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  profile::{CandidateProfile, ProfileField},
};

/// Fields the free-text `query` criterion is checked against.
pub const QUERY_FIELDS: [ProfileField; 5] = [
  ProfileField::Headline,
  ProfileField::Skills,
  ProfileField::Education,
  ProfileField::WorkHistory,
  ProfileField::Projects,
];

// ─── Criteria ────────────────────────────────────────────────────────────────

/// The four optional filters of a saved search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
  pub query:    Option<String>,
  pub location: Option<String>,
  /// Comma-separated; any one entry matching is enough.
  pub skills:   Option<String>,
  pub projects: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
  haystack.to_lowercase().contains(needle_lower)
}

impl SearchCriteria {
  /// `true` when no criterion has any content.
  pub fn is_empty(&self) -> bool {
    [&self.query, &self.location, &self.skills, &self.projects]
      .into_iter()
      .all(|v| non_blank(v).is_none())
  }

  /// A saved search must filter on something.
  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::Validation(
        "at least one of query, location, skills or projects is required".into(),
      ));
    }
    Ok(())
  }

  /// Lowercase whitespace-separated terms of `query`.
  pub fn query_terms(&self) -> Vec<String> {
    non_blank(&self.query)
      .map(|q| q.split_whitespace().map(str::to_lowercase).collect())
      .unwrap_or_default()
  }

  /// Lowercase comma-separated entries of `skills`.
  pub fn skill_terms(&self) -> Vec<String> {
    non_blank(&self.skills)
      .map(|s| {
        s.split(',')
          .map(str::trim)
          .filter(|t| !t.is_empty())
          .map(str::to_lowercase)
          .collect()
      })
      .unwrap_or_default()
  }

  /// Whether `profile` satisfies every non-blank criterion.
  pub fn matches(&self, profile: &CandidateProfile) -> bool {
    let terms = self.query_terms();
    if !terms.is_empty() {
      let hit = QUERY_FIELDS.iter().any(|f| {
        profile
          .visible_field(*f)
          .is_some_and(|text| terms.iter().any(|t| contains_ci(text, t)))
      });
      if !hit {
        return false;
      }
    }

    if let Some(location) = non_blank(&self.location) {
      let needle = location.to_lowercase();
      if !profile
        .visible_field(ProfileField::Location)
        .is_some_and(|text| contains_ci(text, &needle))
      {
        return false;
      }
    }

    let skills = self.skill_terms();
    if !skills.is_empty()
      && !profile
        .visible_field(ProfileField::Skills)
        .is_some_and(|text| skills.iter().any(|s| contains_ci(text, s)))
    {
      return false;
    }

    if let Some(projects) = non_blank(&self.projects) {
      let needle = projects.to_lowercase();
      if !profile
        .visible_field(ProfileField::Projects)
        .is_some_and(|text| contains_ci(text, &needle))
      {
        return false;
      }
    }

    true
  }

  /// The visible fields of `profile` that some criterion hit. Used to tell
  /// the recruiter why a candidate showed up.
  pub fn matched_fields(&self, profile: &CandidateProfile) -> Vec<ProfileField> {
    let mut fields = Vec::new();
    let terms = self.query_terms();
    for f in QUERY_FIELDS {
      if profile
        .visible_field(f)
        .is_some_and(|text| terms.iter().any(|t| contains_ci(text, t)))
      {
        fields.push(f);
      }
    }
    if non_blank(&self.location).is_some()
      && profile.visible_field(ProfileField::Location).is_some()
    {
      fields.push(ProfileField::Location);
    }
    if !self.skill_terms().is_empty() && !fields.contains(&ProfileField::Skills) {
      fields.push(ProfileField::Skills);
    }
    if non_blank(&self.projects).is_some() && !fields.contains(&ProfileField::Projects)
    {
      fields.push(ProfileField::Projects);
    }
    fields.sort();
    fields
  }
}

/// Evaluate `criteria` over a candidate pool. The result has no duplicate
/// profiles and is ordered most-recently-updated first.
pub fn execute<'a>(
  criteria: &SearchCriteria,
  pool: impl IntoIterator<Item = &'a CandidateProfile>,
) -> Vec<&'a CandidateProfile> {
  let mut seen = HashSet::new();
  let mut hits: Vec<_> = pool
    .into_iter()
    .filter(|p| criteria.matches(p))
    .filter(|p| seen.insert(p.profile_id))
    .collect();
  hits.sort_by(|a, b| {
    b.updated_at
      .cmp(&a.updated_at)
      .then_with(|| a.profile_id.cmp(&b.profile_id))
  });
  hits
}

// ─── SavedSearch ─────────────────────────────────────────────────────────────

/// A persisted, re-runnable candidate filter owned by a recruiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
  pub search_id:            Uuid,
  pub recruiter_id:         Uuid,
  pub name:                 String,
  pub criteria:             SearchCriteria,
  pub notification_enabled: bool,
  /// When the notification differ last completed a batch for this search.
  pub last_notified:        Option<DateTime<Utc>>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

/// Input to [`crate::store::JobBoardStore::add_saved_search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSavedSearch {
  pub recruiter_id:         Uuid,
  pub name:                 String,
  pub criteria:             SearchCriteria,
  #[serde(default = "default_true")]
  pub notification_enabled: bool,
}

/// Editable parts of a saved search; `None` leaves a part unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedSearchUpdate {
  pub name:                 Option<String>,
  pub criteria:             Option<SearchCriteria>,
  pub notification_enabled: Option<bool>,
}

fn default_true() -> bool { true }

impl NewSavedSearch {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("name is required".into()));
    }
    self.criteria.validate()
  }
}

/// Filter for [`crate::store::JobBoardStore::list_saved_searches`].
#[derive(Debug, Clone, Default)]
pub struct SavedSearchQuery {
  pub recruiter_id:         Option<Uuid>,
  pub notification_enabled: Option<bool>,
}

/// Proof that a candidate was announced to a search's owner. At most one per
/// `(search_id, candidate_id)`; never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
  pub search_id:    Uuid,
  /// The candidate's user id.
  pub candidate_id: Uuid,
  pub notified_at:  DateTime<Utc>,
}
