//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision, so lexical order in SQL equals chronological order. UUIDs are
//! stored as hyphenated lowercase strings; enums by their snake_case name.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use jobboard_core::{
  application::{ApplicationStatus, JobApplication},
  identity::{Role, User},
  job::{ExperienceLevel, GeoPoint, JobPosting, SalaryRange, WorkMode},
  messaging::ApplicationMessage,
  profile::{CandidateProfile, Visibility},
  search::{NotificationRecord, SavedSearch, SearchCriteria},
  staged::Staged,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// The store's clock. Truncated to the precision that survives a round trip.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, role, display_name, email, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:      String,
  pub role:         String,
  pub display_name: String,
  pub email:        String,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      role:         row.get(1)?,
      display_name: row.get(2)?,
      email:        row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      role:         decode_enum::<Role>("role", &self.role)?,
      display_name: self.display_name,
      email:        self.email,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const PROFILE_COLUMNS: &str = "p.profile_id, p.user_id, p.headline, p.skills, \
                                   p.education, p.work_history, p.links, p.location, \
                                   p.projects, p.visibility, p.created_at, p.updated_at";

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:   String,
  pub user_id:      String,
  pub headline:     String,
  pub skills:       String,
  pub education:    String,
  pub work_history: String,
  pub links:        String,
  pub location:     String,
  pub projects:     String,
  pub visibility:   u8,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:   row.get(0)?,
      user_id:      row.get(1)?,
      headline:     row.get(2)?,
      skills:       row.get(3)?,
      education:    row.get(4)?,
      work_history: row.get(5)?,
      links:        row.get(6)?,
      location:     row.get(7)?,
      projects:     row.get(8)?,
      visibility:   row.get(9)?,
      created_at:   row.get(10)?,
      updated_at:   row.get(11)?,
    })
  }

  pub fn into_profile(self) -> Result<CandidateProfile> {
    Ok(CandidateProfile {
      profile_id:   decode_uuid(&self.profile_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      headline:     self.headline,
      skills:       self.skills,
      education:    self.education,
      work_history: self.work_history,
      links:        self.links,
      location:     self.location,
      projects:     self.projects,
      visibility:   Visibility::from_bits(self.visibility),
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const JOB_COLUMNS: &str = "job_id, recruiter_id, title, company, description, \
                               skills_required, location, salary_min, salary_max, \
                               work_mode, experience_level, visa_sponsorship, is_active, \
                               created_at, updated_at, latitude, longitude";

/// Raw values read directly from a `jobs` row.
pub struct RawJob {
  pub job_id:           String,
  pub recruiter_id:     String,
  pub title:            String,
  pub company:          String,
  pub description:      String,
  pub skills_required:  String,
  pub location:         Option<String>,
  pub salary_min:       Option<u32>,
  pub salary_max:       Option<u32>,
  pub work_mode:        String,
  pub experience_level: String,
  pub visa_sponsorship: bool,
  pub is_active:        bool,
  pub created_at:       String,
  pub updated_at:       String,
  pub latitude:         Option<f64>,
  pub longitude:        Option<f64>,
}

impl RawJob {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:           row.get(0)?,
      recruiter_id:     row.get(1)?,
      title:            row.get(2)?,
      company:          row.get(3)?,
      description:      row.get(4)?,
      skills_required:  row.get(5)?,
      location:         row.get(6)?,
      salary_min:       row.get(7)?,
      salary_max:       row.get(8)?,
      work_mode:        row.get(9)?,
      experience_level: row.get(10)?,
      visa_sponsorship: row.get(11)?,
      is_active:        row.get(12)?,
      created_at:       row.get(13)?,
      updated_at:       row.get(14)?,
      latitude:         row.get(15)?,
      longitude:        row.get(16)?,
    })
  }

  pub fn into_job(self) -> Result<JobPosting> {
    Ok(JobPosting {
      job_id:           decode_uuid(&self.job_id)?,
      recruiter_id:     decode_uuid(&self.recruiter_id)?,
      title:            self.title,
      company:          self.company,
      description:      self.description,
      skills_required:  self.skills_required,
      location:         self.location,
      coordinates:      match (self.latitude, self.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
      },
      salary:           SalaryRange { min: self.salary_min, max: self.salary_max },
      work_mode:        decode_enum::<WorkMode>("work mode", &self.work_mode)?,
      experience_level: decode_enum::<ExperienceLevel>(
        "experience level",
        &self.experience_level,
      )?,
      visa_sponsorship: self.visa_sponsorship,
      is_active:        self.is_active,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const SEARCH_COLUMNS: &str = "search_id, recruiter_id, name, query, location, skills, \
                                  projects, notification_enabled, last_notified, \
                                  created_at, updated_at";

/// Raw values read directly from a `saved_searches` row.
pub struct RawSavedSearch {
  pub search_id:            String,
  pub recruiter_id:         String,
  pub name:                 String,
  pub query:                Option<String>,
  pub location:             Option<String>,
  pub skills:               Option<String>,
  pub projects:             Option<String>,
  pub notification_enabled: bool,
  pub last_notified:        Option<String>,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawSavedSearch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      search_id:            row.get(0)?,
      recruiter_id:         row.get(1)?,
      name:                 row.get(2)?,
      query:                row.get(3)?,
      location:             row.get(4)?,
      skills:               row.get(5)?,
      projects:             row.get(6)?,
      notification_enabled: row.get(7)?,
      last_notified:        row.get(8)?,
      created_at:           row.get(9)?,
      updated_at:           row.get(10)?,
    })
  }

  pub fn into_saved_search(self) -> Result<SavedSearch> {
    Ok(SavedSearch {
      search_id:            decode_uuid(&self.search_id)?,
      recruiter_id:         decode_uuid(&self.recruiter_id)?,
      name:                 self.name,
      criteria:             SearchCriteria {
        query:    self.query,
        location: self.location,
        skills:   self.skills,
        projects: self.projects,
      },
      notification_enabled: self.notification_enabled,
      last_notified:        decode_opt_dt(self.last_notified)?,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `search_notifications` row.
pub struct RawNotification {
  pub search_id:    String,
  pub candidate_id: String,
  pub notified_at:  String,
}

impl RawNotification {
  pub fn into_record(self) -> Result<NotificationRecord> {
    Ok(NotificationRecord {
      search_id:    decode_uuid(&self.search_id)?,
      candidate_id: decode_uuid(&self.candidate_id)?,
      notified_at:  decode_dt(&self.notified_at)?,
    })
  }
}

pub const MESSAGE_COLUMNS: &str = "message_id, application_id, sender_id, content, \
                                   created_at, is_read";

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:     String,
  pub application_id: String,
  pub sender_id:      String,
  pub content:        String,
  pub created_at:     String,
  pub is_read:        bool,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:     row.get(0)?,
      application_id: row.get(1)?,
      sender_id:      row.get(2)?,
      content:        row.get(3)?,
      created_at:     row.get(4)?,
      is_read:        row.get(5)?,
    })
  }

  pub fn into_message(self) -> Result<ApplicationMessage> {
    Ok(ApplicationMessage {
      message_id:     decode_uuid(&self.message_id)?,
      application_id: decode_uuid(&self.application_id)?,
      sender_id:      decode_uuid(&self.sender_id)?,
      content:        self.content,
      created_at:     decode_dt(&self.created_at)?,
      is_read:        self.is_read,
    })
  }
}

pub const APPLICATION_COLUMNS: &str = "application_id, job_id, applicant_id, cover_note, \
                                       status, published_status, rejection_reason, \
                                       applied_at, updated_at, status_updated_at";

/// Raw values read directly from an `applications` row.
pub struct RawApplication {
  pub application_id:    String,
  pub job_id:            String,
  pub applicant_id:      String,
  pub cover_note:        Option<String>,
  pub status:            String,
  pub published_status:  String,
  pub rejection_reason:  Option<String>,
  pub applied_at:        String,
  pub updated_at:        String,
  pub status_updated_at: String,
}

impl RawApplication {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id:    row.get(0)?,
      job_id:            row.get(1)?,
      applicant_id:      row.get(2)?,
      cover_note:        row.get(3)?,
      status:            row.get(4)?,
      published_status:  row.get(5)?,
      rejection_reason:  row.get(6)?,
      applied_at:        row.get(7)?,
      updated_at:        row.get(8)?,
      status_updated_at: row.get(9)?,
    })
  }

  pub fn into_application(self) -> Result<JobApplication> {
    let actual = decode_enum::<ApplicationStatus>("status", &self.status)?;
    let published = decode_enum::<ApplicationStatus>("status", &self.published_status)?;
    Ok(JobApplication {
      application_id:    decode_uuid(&self.application_id)?,
      job_id:            decode_uuid(&self.job_id)?,
      applicant_id:      decode_uuid(&self.applicant_id)?,
      cover_note:        self.cover_note,
      status:            Staged::from_parts(actual, published),
      rejection_reason:  self.rejection_reason,
      applied_at:        decode_dt(&self.applied_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
      status_updated_at: decode_dt(&self.status_updated_at)?,
    })
  }
}
