//! In-memory values shared by the unit tests.

use chrono::Utc;
use uuid::Uuid;

use crate::{
  identity::{Role, User},
  job::{JobPosting, SalaryRange},
  profile::{CandidateProfile, Visibility},
  search::{SavedSearch, SearchCriteria},
};

pub(crate) fn user(role: Role, name: &str) -> User {
  User {
    user_id: Uuid::new_v4(),
    role,
    display_name: name.to_owned(),
    email: format!("{}@example.com", name.to_lowercase()),
    created_at: Utc::now(),
  }
}

pub(crate) fn profile(skills: &str) -> CandidateProfile {
  let now = Utc::now();
  CandidateProfile {
    profile_id:   Uuid::new_v4(),
    user_id:      Uuid::new_v4(),
    headline:     "Backend engineer".into(),
    skills:       skills.into(),
    education:    "BSc".into(),
    work_history: String::new(),
    links:        "https://example.com".into(),
    location:     "Austin, TX".into(),
    projects:     String::new(),
    visibility:   Visibility::all(),
    created_at:   now,
    updated_at:   now,
  }
}

pub(crate) fn job(recruiter_id: Uuid, skills: &str) -> JobPosting {
  let now = Utc::now();
  JobPosting {
    job_id: Uuid::new_v4(),
    recruiter_id,
    title: "Engineer".into(),
    company: "Acme".into(),
    description: String::new(),
    skills_required: skills.into(),
    location: None,
    coordinates: None,
    salary: SalaryRange::default(),
    work_mode: Default::default(),
    experience_level: Default::default(),
    visa_sponsorship: false,
    is_active: true,
    created_at: now,
    updated_at: now,
  }
}

pub(crate) fn saved_search(recruiter_id: Uuid, criteria: SearchCriteria) -> SavedSearch {
  let now = Utc::now();
  SavedSearch {
    search_id: Uuid::new_v4(),
    recruiter_id,
    name: "Backend hires".into(),
    criteria,
    notification_enabled: true,
    last_notified: None,
    created_at: now,
    updated_at: now,
  }
}
