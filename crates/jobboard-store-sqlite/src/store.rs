//! [`SqliteStore`]: the SQLite implementation of [`JobBoardStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use jobboard_core::{
  application::{JobApplication, NewApplication},
  identity::{NewUser, User},
  job::{JobPosting, NewJob},
  messaging::{ApplicationMessage, NewMessage},
  profile::{CandidateProfile, ProfileInput},
  search::{
    NewSavedSearch, NotificationRecord, SavedSearch, SavedSearchQuery, SavedSearchUpdate,
  },
  staged::Staged,
  store::{ApplicationQuery, JobBoardStore, ProfileQuery},
};

use crate::{
  Result,
  encode::{
    APPLICATION_COLUMNS, JOB_COLUMNS, PROFILE_COLUMNS, RawApplication, RawJob,
    RawNotification, RawProfile, RawSavedSearch, RawUser, SEARCH_COLUMNS, USER_COLUMNS,
    MESSAGE_COLUMNS, RawMessage, decode_dt, decode_uuid, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A job board store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a job row, or overwrite the editable columns of an existing one.
  async fn write_job(&self, job: &JobPosting) -> Result<()> {
    let job_id_str       = encode_uuid(job.job_id);
    let recruiter_id_str = encode_uuid(job.recruiter_id);
    let title            = job.title.clone();
    let company          = job.company.clone();
    let description      = job.description.clone();
    let skills_required  = job.skills_required.clone();
    let location         = job.location.clone();
    let latitude         = job.coordinates.map(|c| c.lat);
    let longitude        = job.coordinates.map(|c| c.lng);
    let salary           = job.salary;
    let work_mode        = job.work_mode.as_ref().to_owned();
    let experience_level = job.experience_level.as_ref().to_owned();
    let visa_sponsorship = job.visa_sponsorship;
    let is_active        = job.is_active;
    let created_at_str   = encode_dt(job.created_at);
    let updated_at_str   = encode_dt(job.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO jobs (
             job_id, recruiter_id, title, company, description,
             skills_required, location, salary_min, salary_max,
             work_mode, experience_level, visa_sponsorship, is_active,
             created_at, updated_at, latitude, longitude
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
           ON CONFLICT (job_id) DO UPDATE SET
             title = excluded.title,
             company = excluded.company,
             description = excluded.description,
             skills_required = excluded.skills_required,
             location = excluded.location,
             salary_min = excluded.salary_min,
             salary_max = excluded.salary_max,
             work_mode = excluded.work_mode,
             experience_level = excluded.experience_level,
             visa_sponsorship = excluded.visa_sponsorship,
             is_active = excluded.is_active,
             updated_at = excluded.updated_at,
             latitude = excluded.latitude,
             longitude = excluded.longitude",
          rusqlite::params![
            job_id_str,
            recruiter_id_str,
            title,
            company,
            description,
            skills_required,
            location,
            salary.min,
            salary.max,
            work_mode,
            experience_level,
            visa_sponsorship,
            is_active,
            created_at_str,
            updated_at_str,
            latitude,
            longitude,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Overwrite the mutable columns of a saved search row.
  async fn write_saved_search(&self, search: &SavedSearch) -> Result<()> {
    let id_str         = encode_uuid(search.search_id);
    let name           = search.name.clone();
    let criteria       = search.criteria.clone();
    let enabled        = search.notification_enabled;
    let updated_at_str = encode_dt(search.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE saved_searches
             SET name = ?2, query = ?3, location = ?4, skills = ?5, projects = ?6,
                 notification_enabled = ?7, updated_at = ?8
           WHERE search_id = ?1",
          rusqlite::params![
            id_str,
            name,
            criteria.query,
            criteria.location,
            criteria.skills,
            criteria.projects,
            enabled,
            updated_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── JobBoardStore impl ──────────────────────────────────────────────────────

impl JobBoardStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      role:         input.role,
      display_name: input.display_name,
      email:        input.email,
      created_at:   now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let role_str = user.role.as_ref().to_owned();
    let name     = user.display_name.clone();
    let email    = user.email.clone();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, role, display_name, email, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, role_str, name, email, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(
    &self,
    user_id: Uuid,
    input: ProfileInput,
  ) -> Result<CandidateProfile> {
    let at = now();
    let mut profile = CandidateProfile {
      profile_id:   Uuid::new_v4(),
      user_id,
      headline:     input.headline,
      skills:       input.skills,
      education:    input.education,
      work_history: input.work_history,
      links:        input.links,
      location:     input.location,
      projects:     input.projects,
      visibility:   input.visibility,
      created_at:   at,
      updated_at:   at,
    };

    // An existing row keeps its id and creation time; read them back from
    // the same statement so concurrent first saves agree on the id.
    let p = profile.clone();
    let (id_str, created_str): (String, String) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO profiles (
             profile_id, user_id, headline, skills, education, work_history,
             links, location, projects, visibility, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           ON CONFLICT (user_id) DO UPDATE SET
             headline = excluded.headline,
             skills = excluded.skills,
             education = excluded.education,
             work_history = excluded.work_history,
             links = excluded.links,
             location = excluded.location,
             projects = excluded.projects,
             visibility = excluded.visibility,
             updated_at = excluded.updated_at
           RETURNING profile_id, created_at",
          rusqlite::params![
            encode_uuid(p.profile_id),
            encode_uuid(p.user_id),
            p.headline,
            p.skills,
            p.education,
            p.work_history,
            p.links,
            p.location,
            p.projects,
            p.visibility.bits(),
            encode_dt(p.created_at),
            encode_dt(p.updated_at),
          ],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;
    profile.profile_id = decode_uuid(&id_str)?;
    profile.created_at = decode_dt(&created_str)?;

    debug!(profile_id = %profile.profile_id, %user_id, "profile saved");
    Ok(profile)
  }

  async fn get_profile(&self, profile_id: Uuid) -> Result<Option<CandidateProfile>> {
    let id_str = encode_uuid(profile_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.profile_id = ?1"),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_profile_by_user(&self, user_id: Uuid) -> Result<Option<CandidateProfile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.user_id = ?1"),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
  ) -> Result<Vec<CandidateProfile>> {
    let role_str  = query.role.map(|r| r.as_ref().to_owned());
    let after_str = query.updated_after.map(encode_dt);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS}
           FROM profiles p
           JOIN users u ON u.user_id = p.user_id
           WHERE (?1 IS NULL OR u.role = ?1)
             AND (?2 IS NULL OR p.updated_at > ?2)
           ORDER BY p.updated_at DESC, p.profile_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![role_str, after_str], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn add_job(&self, recruiter_id: Uuid, input: NewJob) -> Result<JobPosting> {
    let at = now();
    let job = JobPosting {
      job_id: Uuid::new_v4(),
      recruiter_id,
      title: input.title,
      company: input.company,
      description: input.description,
      skills_required: input.skills_required,
      location: input.location,
      coordinates: input.coordinates,
      salary: input.salary,
      work_mode: input.work_mode,
      experience_level: input.experience_level,
      visa_sponsorship: input.visa_sponsorship,
      is_active: true,
      created_at: at,
      updated_at: at,
    };
    self.write_job(&job).await?;
    Ok(job)
  }

  async fn get_job(&self, id: Uuid) -> Result<Option<JobPosting>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
            rusqlite::params![id_str],
            RawJob::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn update_job(
    &self,
    id: Uuid,
    input: NewJob,
    is_active: bool,
  ) -> Result<Option<JobPosting>> {
    let Some(existing) = self.get_job(id).await? else {
      return Ok(None);
    };
    let job = JobPosting {
      title: input.title,
      company: input.company,
      description: input.description,
      skills_required: input.skills_required,
      location: input.location,
      coordinates: input.coordinates,
      salary: input.salary,
      work_mode: input.work_mode,
      experience_level: input.experience_level,
      visa_sponsorship: input.visa_sponsorship,
      is_active,
      updated_at: now(),
      ..existing
    };
    self.write_job(&job).await?;
    Ok(Some(job))
  }

  async fn delete_job(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM jobs WHERE job_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn list_jobs(&self, active_only: bool) -> Result<Vec<JobPosting>> {
    let raws: Vec<RawJob> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {JOB_COLUMNS} FROM jobs
           WHERE (?1 = 0 OR is_active = 1)
           ORDER BY created_at DESC, job_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![active_only], RawJob::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }

  // ── Saved searches ────────────────────────────────────────────────────────

  async fn add_saved_search(&self, input: NewSavedSearch) -> Result<SavedSearch> {
    let at = now();
    let search = SavedSearch {
      search_id:            Uuid::new_v4(),
      recruiter_id:         input.recruiter_id,
      name:                 input.name,
      criteria:             input.criteria,
      notification_enabled: input.notification_enabled,
      last_notified:        None,
      created_at:           at,
      updated_at:           at,
    };

    let s = search.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO saved_searches (
             search_id, recruiter_id, name, query, location, skills, projects,
             notification_enabled, last_notified, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10)",
          rusqlite::params![
            encode_uuid(s.search_id),
            encode_uuid(s.recruiter_id),
            s.name,
            s.criteria.query,
            s.criteria.location,
            s.criteria.skills,
            s.criteria.projects,
            s.notification_enabled,
            encode_dt(s.created_at),
            encode_dt(s.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(search)
  }

  async fn get_saved_search(&self, id: Uuid) -> Result<Option<SavedSearch>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSavedSearch> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SEARCH_COLUMNS} FROM saved_searches WHERE search_id = ?1"),
            rusqlite::params![id_str],
            RawSavedSearch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSavedSearch::into_saved_search).transpose()
  }

  async fn list_saved_searches<'a>(
    &'a self,
    query: &'a SavedSearchQuery,
  ) -> Result<Vec<SavedSearch>> {
    let owner_str = query.recruiter_id.map(encode_uuid);
    let enabled   = query.notification_enabled;

    let raws: Vec<RawSavedSearch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEARCH_COLUMNS} FROM saved_searches
           WHERE (?1 IS NULL OR recruiter_id = ?1)
             AND (?2 IS NULL OR notification_enabled = ?2)
           ORDER BY created_at ASC, search_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str, enabled], RawSavedSearch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSavedSearch::into_saved_search).collect()
  }

  async fn update_saved_search(
    &self,
    id: Uuid,
    update: SavedSearchUpdate,
  ) -> Result<Option<SavedSearch>> {
    let Some(mut search) = self.get_saved_search(id).await? else {
      return Ok(None);
    };
    if let Some(name) = update.name {
      search.name = name;
    }
    if let Some(criteria) = update.criteria {
      search.criteria = criteria;
    }
    if let Some(enabled) = update.notification_enabled {
      search.notification_enabled = enabled;
    }
    search.updated_at = now();
    self.write_saved_search(&search).await?;
    Ok(Some(search))
  }

  async fn set_last_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE saved_searches SET last_notified = ?2 WHERE search_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn rewind_last_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE saved_searches SET last_notified = ?2
           WHERE search_id = ?1 AND last_notified > ?2",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_saved_search(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM saved_searches WHERE search_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Notification records ──────────────────────────────────────────────────

  async fn record_notification(
    &self,
    search_id: Uuid,
    candidate_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Option<NotificationRecord>> {
    let search_str    = encode_uuid(search_id);
    let candidate_str = encode_uuid(candidate_id);
    let at_str        = encode_dt(at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO search_notifications (search_id, candidate_id, notified_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (search_id, candidate_id) DO NOTHING",
          rusqlite::params![search_str, candidate_str, at_str],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(NotificationRecord {
      search_id,
      candidate_id,
      notified_at: at,
    }))
  }

  async fn forget_notification(&self, search_id: Uuid, candidate_id: Uuid) -> Result<bool> {
    let search_str    = encode_uuid(search_id);
    let candidate_str = encode_uuid(candidate_id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM search_notifications WHERE search_id = ?1 AND candidate_id = ?2",
          rusqlite::params![search_str, candidate_str],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  async fn list_notifications(&self, search_id: Uuid) -> Result<Vec<NotificationRecord>> {
    let id_str = encode_uuid(search_id);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT search_id, candidate_id, notified_at
           FROM search_notifications
           WHERE search_id = ?1
           ORDER BY notified_at ASC, candidate_id ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawNotification {
              search_id:    row.get(0)?,
              candidate_id: row.get(1)?,
              notified_at:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_record).collect()
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn add_application(&self, input: NewApplication) -> Result<Option<JobApplication>> {
    let at = now();
    let application = JobApplication {
      application_id:    Uuid::new_v4(),
      job_id:            input.job_id,
      applicant_id:      input.applicant_id,
      cover_note:        input.cover_note,
      status:            Staged::new(Default::default()),
      rejection_reason:  None,
      applied_at:        at,
      updated_at:        at,
      status_updated_at: at,
    };

    let a = application.clone();
    let inserted = self
      .conn
      .call(move |conn| {
        let status = a.status.actual().as_ref().to_owned();
        Ok(conn.execute(
          "INSERT INTO applications (
             application_id, job_id, applicant_id, cover_note, status,
             published_status, rejection_reason, applied_at, updated_at,
             status_updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, NULL, ?6, ?6, ?6)
           ON CONFLICT (job_id, applicant_id) DO NOTHING",
          rusqlite::params![
            encode_uuid(a.application_id),
            encode_uuid(a.job_id),
            encode_uuid(a.applicant_id),
            a.cover_note,
            status,
            encode_dt(a.applied_at),
          ],
        )?)
      })
      .await?;

    Ok((inserted > 0).then_some(application))
  }

  async fn get_application(&self, id: Uuid) -> Result<Option<JobApplication>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawApplication> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = ?1"
            ),
            rusqlite::params![id_str],
            RawApplication::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn save_application<'a>(&'a self, application: &'a JobApplication) -> Result<()> {
    let id_str        = encode_uuid(application.application_id);
    let status        = application.status.actual().as_ref().to_owned();
    let published     = application.status.published().as_ref().to_owned();
    let reason        = application.rejection_reason.clone();
    let updated_str   = encode_dt(application.updated_at);
    let status_at_str = encode_dt(application.status_updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE applications
             SET status = ?2, published_status = ?3, rejection_reason = ?4,
                 updated_at = ?5, status_updated_at = ?6
           WHERE application_id = ?1",
          rusqlite::params![id_str, status, published, reason, updated_str, status_at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> Result<Vec<JobApplication>> {
    let job_str       = query.job_id.map(encode_uuid);
    let applicant_str = query.applicant_id.map(encode_uuid);

    let raws: Vec<RawApplication> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {APPLICATION_COLUMNS} FROM applications
           WHERE (?1 IS NULL OR job_id = ?1)
             AND (?2 IS NULL OR applicant_id = ?2)
           ORDER BY applied_at DESC, application_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![job_str, applicant_str], RawApplication::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApplication::into_application).collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn add_message(&self, input: NewMessage) -> Result<ApplicationMessage> {
    let message = ApplicationMessage {
      message_id:     Uuid::new_v4(),
      application_id: input.application_id,
      sender_id:      input.sender_id,
      content:        input.content,
      created_at:     now(),
      is_read:        false,
    };

    let m = message.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             message_id, application_id, sender_id, content, created_at, is_read
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0)",
          rusqlite::params![
            encode_uuid(m.message_id),
            encode_uuid(m.application_id),
            encode_uuid(m.sender_id),
            m.content,
            encode_dt(m.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn list_messages(&self, application_id: Uuid) -> Result<Vec<ApplicationMessage>> {
    let id_str = encode_uuid(application_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        // rowid keeps insertion order for messages sent in the same microsecond.
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE application_id = ?1
           ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn mark_messages_read(&self, application_id: Uuid, reader_id: Uuid) -> Result<usize> {
    let app_str    = encode_uuid(application_id);
    let reader_str = encode_uuid(reader_id);
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET is_read = 1
           WHERE application_id = ?1 AND sender_id != ?2 AND is_read = 0",
          rusqlite::params![app_str, reader_str],
        )?)
      })
      .await?;
    Ok(n)
  }

  async fn count_unread_messages(&self, user_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(user_id);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM messages m
           JOIN applications a ON a.application_id = m.application_id
           JOIN jobs j ON j.job_id = a.job_id
           WHERE m.is_read = 0
             AND m.sender_id != ?1
             AND (a.applicant_id = ?1 OR j.recruiter_id = ?1)",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(n as usize)
  }
}
