//! Integration tests for `SqliteStore` against an in-memory database, and for
//! the core operations running on top of it.

use std::sync::Mutex;

use chrono::{DateTime, Duration, SubsecRound as _, Utc};
use jobboard_core::{
  Error as CoreError,
  application::{
    ApplicationStatus, JobApplication, NewApplication, apply_to_job, my_applications,
    publish_statuses, reject_application, update_application_status,
  },
  identity::{NewUser, Role, User},
  job::{GeoPoint, GeoQuery, JobPosting, NewJob, nearby_jobs},
  messaging::{
    ApplicationMessage, NewMessage, conversations, open_thread, send_message,
    unread_message_count,
  },
  notify::{
    NotificationReport, Notice, Notifier, NotifyOptions, notify_on_profile_change,
    process_all_notifications, process_notifications,
  },
  profile::{CandidateProfile, ProfileField, ProfileInput, Visibility},
  recommend::{recommend_candidates, recommend_jobs},
  saved_search::{create_saved_search, delete_saved_search, run_saved_search},
  search::{
    NewSavedSearch, NotificationRecord, SavedSearch, SavedSearchQuery, SavedSearchUpdate,
    SearchCriteria, execute,
  },
  store::{ApplicationQuery, JobBoardStore, ProfileQuery},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, role: Role, name: &str) -> User {
  s.add_user(NewUser {
    role,
    display_name: name.into(),
    email: format!("{}@example.com", name.to_lowercase()),
  })
  .await
  .unwrap()
}

fn profile_input(skills: &str) -> ProfileInput {
  ProfileInput {
    headline: "Engineer".into(),
    skills: skills.into(),
    education: "BSc Computer Science".into(),
    work_history: "Acme, 2019-2024".into(),
    location: "Austin, TX".into(),
    ..Default::default()
  }
}

async fn seeker(s: &SqliteStore, name: &str, skills: &str) -> (User, CandidateProfile) {
  let u = user(s, Role::JobSeeker, name).await;
  let p = s.upsert_profile(u.user_id, profile_input(skills)).await.unwrap();
  (u, p)
}

fn job_input(skills: &str) -> NewJob {
  NewJob {
    title: "Backend Engineer".into(),
    company: "Acme".into(),
    skills_required: skills.into(),
    ..Default::default()
  }
}

fn skills_search(recruiter: &User, skills: &str) -> NewSavedSearch {
  NewSavedSearch {
    recruiter_id:         recruiter.user_id,
    name:                 format!("{skills} people"),
    criteria:             SearchCriteria { skills: Some(skills.into()), ..Default::default() },
    notification_enabled: true,
  }
}

fn opts() -> NotifyOptions { NotifyOptions::at(Utc::now().trunc_subsecs(6)) }

/// Remembers who was announced to whom.
#[derive(Default)]
struct Recording {
  sent: Mutex<Vec<(String, Uuid)>>,
}

impl Recording {
  fn sent(&self) -> Vec<(String, Uuid)> { self.sent.lock().unwrap().clone() }
}

impl Notifier for Recording {
  async fn notify<'a>(&'a self, notice: &'a Notice<'a>) -> jobboard_core::Result<()> {
    self
      .sent
      .lock()
      .unwrap()
      .push((notice.recruiter.email.clone(), notice.candidate.user_id));
    Ok(())
  }
}

/// Fails delivery for one candidate, succeeds for everyone else.
struct FailFor(Uuid);

impl Notifier for FailFor {
  async fn notify<'a>(&'a self, notice: &'a Notice<'a>) -> jobboard_core::Result<()> {
    if notice.candidate.user_id == self.0 {
      return Err(CoreError::Delivery("mailbox unavailable".into()));
    }
    Ok(())
  }
}

async fn reload(s: &SqliteStore, search: &SavedSearch) -> SavedSearch {
  s.get_saved_search(search.search_id).await.unwrap().unwrap()
}

/// Runs a full batch for `search_id` from inside delivery and then fails, so
/// the batch sees the caller's record while it is still in flight.
struct BatchThenFail<'s> {
  store:     &'s SqliteStore,
  search_id: Uuid,
  report:    Mutex<Option<NotificationReport>>,
}

impl Notifier for BatchThenFail<'_> {
  async fn notify<'a>(&'a self, _notice: &'a Notice<'a>) -> jobboard_core::Result<()> {
    let report =
      process_notifications(self.store, &Recording::default(), self.search_id, opts()).await?;
    *self.report.lock().unwrap() = Some(report);
    Err(CoreError::Delivery("smtp timeout".into()))
  }
}

/// A `SqliteStore` with failures and interleavings injected per candidate.
struct Faulty {
  inner:                SqliteStore,
  /// `get_user` fails for this id.
  broken_user:          Option<Uuid>,
  /// `forget_notification` fails for this candidate.
  stuck_record:         Option<Uuid>,
  /// Withdraw this candidate's record (search, candidate) just before the
  /// batch writes its mark, as a profile-save hook whose delivery failed
  /// would.
  withdraw_before_mark: Option<(Uuid, Uuid)>,
}

impl Faulty {
  fn new(inner: SqliteStore) -> Self {
    Self { inner, broken_user: None, stuck_record: None, withdraw_before_mark: None }
  }
}

fn injected() -> crate::Error { crate::Error::Decode("injected failure".into()) }

impl JobBoardStore for Faulty {
  type Error = crate::Error;

  async fn add_user(&self, input: NewUser) -> crate::Result<User> {
    self.inner.add_user(input).await
  }

  async fn get_user(&self, id: Uuid) -> crate::Result<Option<User>> {
    if self.broken_user == Some(id) {
      return Err(injected());
    }
    self.inner.get_user(id).await
  }

  async fn upsert_profile(
    &self,
    user_id: Uuid,
    input: ProfileInput,
  ) -> crate::Result<CandidateProfile> {
    self.inner.upsert_profile(user_id, input).await
  }

  async fn get_profile(&self, profile_id: Uuid) -> crate::Result<Option<CandidateProfile>> {
    self.inner.get_profile(profile_id).await
  }

  async fn get_profile_by_user(
    &self,
    user_id: Uuid,
  ) -> crate::Result<Option<CandidateProfile>> {
    self.inner.get_profile_by_user(user_id).await
  }

  async fn list_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
  ) -> crate::Result<Vec<CandidateProfile>> {
    self.inner.list_profiles(query).await
  }

  async fn add_job(&self, recruiter_id: Uuid, input: NewJob) -> crate::Result<JobPosting> {
    self.inner.add_job(recruiter_id, input).await
  }

  async fn get_job(&self, id: Uuid) -> crate::Result<Option<JobPosting>> {
    self.inner.get_job(id).await
  }

  async fn update_job(
    &self,
    id: Uuid,
    input: NewJob,
    is_active: bool,
  ) -> crate::Result<Option<JobPosting>> {
    self.inner.update_job(id, input, is_active).await
  }

  async fn delete_job(&self, id: Uuid) -> crate::Result<bool> {
    self.inner.delete_job(id).await
  }

  async fn list_jobs(&self, active_only: bool) -> crate::Result<Vec<JobPosting>> {
    self.inner.list_jobs(active_only).await
  }

  async fn add_saved_search(&self, input: NewSavedSearch) -> crate::Result<SavedSearch> {
    self.inner.add_saved_search(input).await
  }

  async fn get_saved_search(&self, id: Uuid) -> crate::Result<Option<SavedSearch>> {
    self.inner.get_saved_search(id).await
  }

  async fn list_saved_searches<'a>(
    &'a self,
    query: &'a SavedSearchQuery,
  ) -> crate::Result<Vec<SavedSearch>> {
    self.inner.list_saved_searches(query).await
  }

  async fn update_saved_search(
    &self,
    id: Uuid,
    update: SavedSearchUpdate,
  ) -> crate::Result<Option<SavedSearch>> {
    self.inner.update_saved_search(id, update).await
  }

  async fn set_last_notified(&self, id: Uuid, at: DateTime<Utc>) -> crate::Result<()> {
    if let Some((search_id, candidate_id)) = self.withdraw_before_mark
      && search_id == id
    {
      let profile = self.inner.get_profile_by_user(candidate_id).await?.unwrap();
      self.inner.forget_notification(search_id, candidate_id).await?;
      self
        .inner
        .rewind_last_notified(search_id, profile.updated_at - Duration::microseconds(1))
        .await?;
    }
    self.inner.set_last_notified(id, at).await
  }

  async fn rewind_last_notified(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> crate::Result<()> {
    self.inner.rewind_last_notified(id, at).await
  }

  async fn delete_saved_search(&self, id: Uuid) -> crate::Result<bool> {
    self.inner.delete_saved_search(id).await
  }

  async fn record_notification(
    &self,
    search_id: Uuid,
    candidate_id: Uuid,
    at: DateTime<Utc>,
  ) -> crate::Result<Option<NotificationRecord>> {
    self.inner.record_notification(search_id, candidate_id, at).await
  }

  async fn forget_notification(&self, search_id: Uuid, candidate_id: Uuid) -> crate::Result<bool> {
    if self.stuck_record == Some(candidate_id) {
      return Err(injected());
    }
    self.inner.forget_notification(search_id, candidate_id).await
  }

  async fn list_notifications(&self, search_id: Uuid) -> crate::Result<Vec<NotificationRecord>> {
    self.inner.list_notifications(search_id).await
  }

  async fn add_application(
    &self,
    input: NewApplication,
  ) -> crate::Result<Option<JobApplication>> {
    self.inner.add_application(input).await
  }

  async fn get_application(
    &self,
    id: Uuid,
  ) -> crate::Result<Option<JobApplication>> {
    self.inner.get_application(id).await
  }

  async fn save_application<'a>(
    &'a self,
    application: &'a JobApplication,
  ) -> crate::Result<()> {
    self.inner.save_application(application).await
  }

  async fn list_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> crate::Result<Vec<JobApplication>> {
    self.inner.list_applications(query).await
  }

  async fn add_message(&self, input: NewMessage) -> crate::Result<ApplicationMessage> {
    self.inner.add_message(input).await
  }

  async fn list_messages(&self, application_id: Uuid) -> crate::Result<Vec<ApplicationMessage>> {
    self.inner.list_messages(application_id).await
  }

  async fn mark_messages_read(&self, application_id: Uuid, reader_id: Uuid) -> crate::Result<usize> {
    self.inner.mark_messages_read(application_id, reader_id).await
  }

  async fn count_unread_messages(&self, user_id: Uuid) -> crate::Result<usize> {
    self.inner.count_unread_messages(user_id).await
  }
}

// ─── Users & profiles ────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  let u = user(&s, Role::Recruiter, "Rita").await;

  let fetched = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.role, Role::Recruiter);
  assert_eq!(fetched.email, "rita@example.com");
  assert_eq!(fetched.created_at, u.created_at);

  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_profile_overwrites_in_place() {
  let s = store().await;
  let (u, first) = seeker(&s, "Carl", "Rust").await;

  let mut input = profile_input("Rust, Go");
  input.visibility = Visibility::all().with(ProfileField::Location, false);
  let second = s.upsert_profile(u.user_id, input).await.unwrap();

  assert_eq!(second.profile_id, first.profile_id);
  assert_eq!(second.created_at, first.created_at);
  assert!(second.updated_at >= first.updated_at);

  let fetched = s.get_profile_by_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.skills, "Rust, Go");
  assert!(!fetched.visibility.is_visible(ProfileField::Location));
  assert_eq!(fetched.updated_at, second.updated_at);
}

#[tokio::test]
async fn list_profiles_by_role_and_time() {
  let s = store().await;
  let recruiter = user(&s, Role::Recruiter, "Rita").await;
  s.upsert_profile(recruiter.user_id, profile_input("Hiring"))
    .await
    .unwrap();
  let (_, older) = seeker(&s, "Ann", "Rust").await;
  let (_, newer) = seeker(&s, "Bob", "Go").await;

  let all = s.list_profiles(&ProfileQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let seekers = s
    .list_profiles(&ProfileQuery { role: Some(Role::JobSeeker), updated_after: None })
    .await
    .unwrap();
  let ids: Vec<_> = seekers.iter().map(|p| p.profile_id).collect();
  assert_eq!(ids, vec![newer.profile_id, older.profile_id]);

  let after = s
    .list_profiles(&ProfileQuery {
      role:          Some(Role::JobSeeker),
      updated_after: Some(older.updated_at),
    })
    .await
    .unwrap();
  assert!(after.iter().all(|p| p.updated_at > older.updated_at));
  assert!(!after.iter().any(|p| p.profile_id == older.profile_id));
}

#[tokio::test]
async fn concurrent_first_saves_agree_on_profile_id() {
  let s = store().await;
  let u = user(&s, Role::JobSeeker, "Pat").await;

  let (a, b) = tokio::join!(
    s.upsert_profile(u.user_id, profile_input("Rust")),
    s.upsert_profile(u.user_id, profile_input("Go")),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.profile_id, b.profile_id);
  assert_eq!(a.created_at, b.created_at);

  let stored = s.get_profile_by_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.profile_id, a.profile_id);
  assert!(s.get_profile(b.profile_id).await.unwrap().is_some());
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn job_lifecycle() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;

  let job = s.add_job(r.user_id, job_input("Python, SQL")).await.unwrap();
  assert!(job.is_active);

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched.skills_required, "Python, SQL");
  assert_eq!(fetched.work_mode, job.work_mode);

  let updated = s
    .update_job(job.job_id, job_input("Python, SQL, Go"), false)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.created_at, job.created_at);
  assert!(!updated.is_active);

  assert!(s.list_jobs(true).await.unwrap().is_empty());
  assert_eq!(s.list_jobs(false).await.unwrap().len(), 1);

  assert!(s.delete_job(job.job_id).await.unwrap());
  assert!(!s.delete_job(job.job_id).await.unwrap());
  assert!(s.update_job(job.job_id, job_input("Go"), true).await.unwrap().is_none());
}

// ─── Saved searches & records ────────────────────────────────────────────────

#[tokio::test]
async fn saved_search_crud() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let other = user(&s, Role::Recruiter, "Olga").await;

  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let mut quiet = skills_search(&other, "Go");
  quiet.notification_enabled = false;
  s.add_saved_search(quiet).await.unwrap();

  let fetched = reload(&s, &search).await;
  assert_eq!(fetched.criteria, search.criteria);
  assert!(fetched.last_notified.is_none());

  let mine = s
    .list_saved_searches(&SavedSearchQuery { recruiter_id: Some(r.user_id), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(mine.len(), 1);
  let enabled = s
    .list_saved_searches(&SavedSearchQuery {
      notification_enabled: Some(true),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(enabled.len(), 1);

  let updated = s
    .update_saved_search(search.search_id, SavedSearchUpdate {
      name: Some("Rustaceans".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "Rustaceans");
  assert_eq!(updated.criteria, search.criteria);

  assert!(s.delete_saved_search(search.search_id).await.unwrap());
  assert!(s.get_saved_search(search.search_id).await.unwrap().is_none());
}

#[tokio::test]
async fn notification_records_are_unique() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let at = Utc::now();

  let first = s.record_notification(search.search_id, c.user_id, at).await.unwrap();
  assert!(first.is_some());
  let dup = s.record_notification(search.search_id, c.user_id, at).await.unwrap();
  assert!(dup.is_none());
  assert_eq!(s.list_notifications(search.search_id).await.unwrap().len(), 1);

  assert!(s.forget_notification(search.search_id, c.user_id).await.unwrap());
  assert!(!s.forget_notification(search.search_id, c.user_id).await.unwrap());
}

#[tokio::test]
async fn deleting_search_drops_its_records() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  s.record_notification(search.search_id, c.user_id, Utc::now())
    .await
    .unwrap();

  s.delete_saved_search(search.search_id).await.unwrap();
  assert!(s.list_notifications(search.search_id).await.unwrap().is_empty());
}

// ─── Notification differ ─────────────────────────────────────────────────────

#[tokio::test]
async fn python_go_search_notifies_once() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (p1_user, p1) = seeker(&s, "Pat", "Python, React").await;
  seeker(&s, "Jay", "Java").await;
  let search = s.add_saved_search(skills_search(&r, "Python, Go")).await.unwrap();

  let pool = s
    .list_profiles(&ProfileQuery { role: Some(Role::JobSeeker), updated_after: None })
    .await
    .unwrap();
  let hits: Vec<_> = execute(&search.criteria, &pool)
    .iter()
    .map(|p| p.profile_id)
    .collect();
  assert_eq!(hits, vec![p1.profile_id]);

  let notifier = Recording::default();
  let first = opts();
  let report = process_notifications(&s, &notifier, search.search_id, first)
    .await
    .unwrap();
  assert_eq!(report.created, 1);
  assert_eq!(report.candidates, vec![p1_user.user_id]);
  assert_eq!(notifier.sent(), vec![(r.email.clone(), p1_user.user_id)]);

  let records = s.list_notifications(search.search_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].candidate_id, p1_user.user_id);
  assert_eq!(reload(&s, &search).await.last_notified, Some(first.now));

  let again = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(again.created, 0);
  assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn notified_candidate_stays_quiet_after_edit() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let notifier = Recording::default();

  process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  s.upsert_profile(c.user_id, profile_input("Rust, Haskell"))
    .await
    .unwrap();
  let (late, _) = seeker(&s, "Lena", "Rust").await;

  let report = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(report.candidates, vec![late.user_id]);
  assert_eq!(report.created, 1);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let notifier = Recording::default();

  let report = process_notifications(&s, &notifier, search.search_id, NotifyOptions {
    dry_run: true,
    ..opts()
  })
  .await
  .unwrap();
  assert!(report.dry_run);
  assert_eq!(report.candidates, vec![c.user_id]);
  assert_eq!(report.created, 0);
  assert!(notifier.sent().is_empty());
  assert!(s.list_notifications(search.search_id).await.unwrap().is_empty());
  assert!(reload(&s, &search).await.last_notified.is_none());
}

#[tokio::test]
async fn failed_delivery_is_retried_next_run() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (flaky, flaky_profile) = seeker(&s, "Finn", "Rust").await;
  let (steady, _) = seeker(&s, "Sara", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();

  let report = process_notifications(&s, &FailFor(flaky.user_id), search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(report.created, 1);
  assert_eq!(report.failed, 1);

  let records = s.list_notifications(search.search_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].candidate_id, steady.user_id);
  let mark = reload(&s, &search).await.last_notified.unwrap();
  assert!(mark < flaky_profile.updated_at);

  let notifier = Recording::default();
  let retry = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(retry.created, 1);
  assert_eq!(notifier.sent(), vec![(r.email.clone(), flaky.user_id)]);
}

#[tokio::test]
async fn profile_save_hook_and_batch_do_not_double_notify() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let (_, p) = seeker(&s, "Carl", "Rust").await;
  let notifier = Recording::default();

  let created = notify_on_profile_change(&s, &notifier, p.profile_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(created, 1);
  assert!(reload(&s, &search).await.last_notified.is_none());

  let again = notify_on_profile_change(&s, &notifier, p.profile_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(again, 0);

  let report = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(report.created, 0);
  assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn recruiter_profiles_are_never_announced() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let other = user(&s, Role::Recruiter, "Olga").await;
  let p = s.upsert_profile(other.user_id, profile_input("Rust")).await.unwrap();
  let notifier = Recording::default();

  let created = notify_on_profile_change(&s, &notifier, p.profile_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(created, 0);
  let reports = process_all_notifications(&s, &notifier, opts()).await.unwrap();
  assert_eq!(reports.iter().map(|r| r.created).sum::<usize>(), 0);
}

#[tokio::test]
async fn batch_skips_disabled_searches() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  seeker(&s, "Carl", "Rust").await;
  let on = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let mut off = skills_search(&r, "Rust");
  off.notification_enabled = false;
  s.add_saved_search(off).await.unwrap();
  let notifier = Recording::default();

  let reports = process_all_notifications(&s, &notifier, opts()).await.unwrap();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].search_id, on.search_id);
  assert_eq!(reports[0].created, 1);
}

// ─── Racing triggers & partial failures ──────────────────────────────────────

#[tokio::test]
async fn hook_losing_delivery_race_leaves_candidate_retryable() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let search = s.add_saved_search(skills_search(&r, "Python")).await.unwrap();
  let (c, p) = seeker(&s, "Pat", "Python").await;

  let racer = BatchThenFail {
    store:     &s,
    search_id: search.search_id,
    report:    Mutex::new(None),
  };
  let created = notify_on_profile_change(&s, &racer, p.profile_id, Utc::now())
    .await
    .unwrap();
  assert_eq!(created, 0);

  // The batch saw the hook's record and stood down.
  let batch = racer.report.lock().unwrap().take().unwrap();
  assert!(batch.candidates.is_empty());
  assert_eq!(batch.created, 0);

  assert!(s.list_notifications(search.search_id).await.unwrap().is_empty());
  let mark = reload(&s, &search).await.last_notified.unwrap();
  assert!(mark < p.updated_at);

  let notifier = Recording::default();
  let retry = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(retry.candidates, vec![c.user_id]);
  assert_eq!(retry.created, 1);
  assert_eq!(notifier.sent(), vec![(r.email.clone(), c.user_id)]);
}

#[tokio::test]
async fn record_withdrawn_before_batch_mark_is_retried() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let (c, p) = seeker(&s, "Carl", "Rust").await;

  // The hook's record exists when the batch diffs, and is withdrawn (with a
  // no-op rewind, since there is no mark yet) before the batch writes its
  // mark.
  s.record_notification(search.search_id, c.user_id, Utc::now())
    .await
    .unwrap()
    .unwrap();
  let mut faulty = Faulty::new(s.clone());
  faulty.withdraw_before_mark = Some((search.search_id, c.user_id));

  let report = process_notifications(&faulty, &Recording::default(), search.search_id, opts())
    .await
    .unwrap();
  assert!(report.candidates.is_empty());

  let mark = reload(&s, &search).await.last_notified.unwrap();
  assert!(mark < p.updated_at);

  let notifier = Recording::default();
  let retry = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(retry.created, 1);
  assert_eq!(notifier.sent(), vec![(r.email.clone(), c.user_id)]);
}

#[tokio::test]
async fn stuck_record_fails_one_candidate_not_the_batch() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (stuck, stuck_profile) = seeker(&s, "Finn", "Rust").await;
  let (steady, _) = seeker(&s, "Sara", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();

  let mut faulty = Faulty::new(s.clone());
  faulty.stuck_record = Some(stuck.user_id);
  let report = process_notifications(&faulty, &FailFor(stuck.user_id), search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(report.created, 1);
  assert_eq!(report.failed, 1);

  let recorded: Vec<_> = s
    .list_notifications(search.search_id)
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.candidate_id)
    .collect();
  assert!(recorded.contains(&steady.user_id));
  let mark = reload(&s, &search).await.last_notified.unwrap();
  assert!(mark < stuck_profile.updated_at);
}

#[tokio::test]
async fn unreadable_candidate_fails_without_leaving_a_record() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (ghost, ghost_profile) = seeker(&s, "Gus", "Rust").await;
  let (steady, _) = seeker(&s, "Sara", "Rust").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();

  let mut faulty = Faulty::new(s.clone());
  faulty.broken_user = Some(ghost.user_id);
  let notifier = Recording::default();
  let report = process_notifications(&faulty, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(report.created, 1);
  assert_eq!(report.failed, 1);
  assert_eq!(notifier.sent(), vec![(r.email.clone(), steady.user_id)]);

  let records = s.list_notifications(search.search_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].candidate_id, steady.user_id);
  assert!(reload(&s, &search).await.last_notified.unwrap() < ghost_profile.updated_at);

  let retry = process_notifications(&s, &notifier, search.search_id, opts())
    .await
    .unwrap();
  assert_eq!(retry.candidates, vec![ghost.user_id]);
  assert_eq!(retry.created, 1);
}

#[tokio::test]
async fn rewind_only_moves_the_mark_back() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let search = s.add_saved_search(skills_search(&r, "Rust")).await.unwrap();
  let t = Utc::now().trunc_subsecs(6);

  s.rewind_last_notified(search.search_id, t).await.unwrap();
  assert!(reload(&s, &search).await.last_notified.is_none());

  s.set_last_notified(search.search_id, t).await.unwrap();
  s.rewind_last_notified(search.search_id, t + Duration::seconds(5))
    .await
    .unwrap();
  assert_eq!(reload(&s, &search).await.last_notified, Some(t));

  let earlier = t - Duration::seconds(5);
  s.rewind_last_notified(search.search_id, earlier).await.unwrap();
  assert_eq!(reload(&s, &search).await.last_notified, Some(earlier));
}

// ─── Saved search operations ─────────────────────────────────────────────────

#[tokio::test]
async fn saved_search_guards() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let other = user(&s, Role::Recruiter, "Olga").await;

  let err = create_saved_search(&s, &c.identity(), skills_search(&c, "Rust"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));

  let empty = NewSavedSearch { criteria: SearchCriteria::default(), ..skills_search(&r, "") };
  let err = create_saved_search(&s, &r.identity(), empty).await.unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));

  // Ownership comes from the identity, not the input.
  let search = create_saved_search(&s, &r.identity(), skills_search(&other, "Rust"))
    .await
    .unwrap();
  assert_eq!(search.recruiter_id, r.user_id);

  let found = run_saved_search(&s, &r.identity(), search.search_id).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].user_id, c.user_id);

  let err = run_saved_search(&s, &other.identity(), search.search_id)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));
  let err = delete_saved_search(&s, &other.identity(), search.search_id)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));

  delete_saved_search(&s, &r.identity(), search.search_id).await.unwrap();
  let err = run_saved_search(&s, &r.identity(), search.search_id)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound { .. }));
}

// ─── Recommendations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn hidden_recruiter_skills_do_not_widen_the_job() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let mut input = profile_input("Go, Kubernetes");
  input.visibility = Visibility::all().with(ProfileField::Skills, false);
  s.upsert_profile(r.user_id, input).await.unwrap();
  let job = s.add_job(r.user_id, job_input("Python, SQL")).await.unwrap();

  let (py, _) = seeker(&s, "Pat", "Python, SQL").await;
  seeker(&s, "Gus", "Go, Kubernetes").await;

  let ranked = recommend_candidates(&s, &r.identity(), job.job_id).await.unwrap();
  assert_eq!(ranked.len(), 1);
  assert_eq!(ranked[0].profile.user_id, py.user_id);
  assert_eq!(ranked[0].overlap, 2);
  assert_eq!(ranked[0].matched_skills, vec!["python", "sql"]);

  // Once visible, the recruiter's skills count too.
  let mut input = profile_input("Go, Kubernetes");
  input.visibility = Visibility::all();
  s.upsert_profile(r.user_id, input).await.unwrap();
  let ranked = recommend_candidates(&s, &r.identity(), job.job_id).await.unwrap();
  assert_eq!(ranked.len(), 2);
  assert!(ranked.iter().all(|m| m.profile.user_id != r.user_id));
}

#[tokio::test]
async fn recommend_candidates_guards() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let other = user(&s, Role::Recruiter, "Olga").await;
  let (c, _) = seeker(&s, "Carl", "Python").await;
  let job = s.add_job(r.user_id, job_input("Python")).await.unwrap();

  let err = recommend_candidates(&s, &other.identity(), job.job_id)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));
  let err = recommend_candidates(&s, &c.identity(), job.job_id)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));
  let err = recommend_candidates(&s, &r.identity(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn recommend_jobs_for_seeker() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let both = s.add_job(r.user_id, job_input("Python, Django")).await.unwrap();
  let one = s.add_job(r.user_id, job_input("Python")).await.unwrap();
  s.add_job(r.user_id, job_input("COBOL")).await.unwrap();
  let closed = s.add_job(r.user_id, job_input("Python, Django")).await.unwrap();
  s.update_job(closed.job_id, job_input("Python, Django"), false)
    .await
    .unwrap();

  let (c, _) = seeker(&s, "Carl", "python django").await;
  let ranked = recommend_jobs(&s, &c.identity()).await.unwrap();
  let ids: Vec<_> = ranked.iter().map(|m| m.job.job_id).collect();
  assert_eq!(ids, vec![both.job_id, one.job_id]);

  let no_profile = user(&s, Role::JobSeeker, "Nina").await;
  let err = recommend_jobs(&s, &no_profile.identity()).await.unwrap_err();
  assert!(matches!(err, CoreError::NotFound { .. }));
}

// ─── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn application_status_is_published_on_demand() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let job = s.add_job(r.user_id, job_input("Rust")).await.unwrap();

  let app = apply_to_job(&s, &c.identity(), job.job_id, Some(" Hi! ".into()))
    .await
    .unwrap();
  assert_eq!(app.cover_note.as_deref(), Some("Hi!"));
  let err = apply_to_job(&s, &c.identity(), job.job_id, None)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)));

  let now = Utc::now();
  update_application_status(
    &s,
    &r.identity(),
    app.application_id,
    ApplicationStatus::Interview,
    false,
    now,
  )
  .await
  .unwrap();
  let mine = my_applications(&s, &c.identity()).await.unwrap();
  assert_eq!(mine[0].status, ApplicationStatus::Applied);

  let n = publish_statuses(&s, &r.identity(), &[app.application_id, Uuid::new_v4()], now)
    .await
    .unwrap();
  assert_eq!(n, 1);
  let mine = my_applications(&s, &c.identity()).await.unwrap();
  assert_eq!(mine[0].status, ApplicationStatus::Interview);
  let again = publish_statuses(&s, &r.identity(), &[app.application_id], now)
    .await
    .unwrap();
  assert_eq!(again, 0);

  let rejected = reject_application(
    &s,
    &r.identity(),
    app.application_id,
    Some("Position filled".into()),
    now,
  )
  .await
  .unwrap();
  assert_eq!(*rejected.status.published(), ApplicationStatus::Rejected);
  let stored = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(stored.rejection_reason.as_deref(), Some("Position filled"));
  assert!(stored.status.is_published());
}

#[tokio::test]
async fn only_job_owner_moves_applications() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let other = user(&s, Role::Recruiter, "Olga").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let job = s.add_job(r.user_id, job_input("Rust")).await.unwrap();
  let app = apply_to_job(&s, &c.identity(), job.job_id, None).await.unwrap();

  let err = update_application_status(
    &s,
    &other.identity(),
    app.application_id,
    ApplicationStatus::Offer,
    true,
    Utc::now(),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));

  let err = apply_to_job(&s, &r.identity(), job.job_id, None).await.unwrap_err();
  assert!(matches!(err, CoreError::Unauthorized(_)));
}

#[tokio::test]
async fn job_coordinates_round_trip_and_filter_by_distance() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let austin = GeoPoint { lat: 30.2672, lng: -97.7431 };
  let mut input = job_input("Rust");
  input.coordinates = Some(austin);
  let near = s.add_job(r.user_id, input).await.unwrap();
  s.add_job(r.user_id, job_input("Go")).await.unwrap();

  let stored = s.get_job(near.job_id).await.unwrap().unwrap();
  assert_eq!(stored.coordinates, Some(austin));

  // Round Rock is about 25 km north of downtown Austin.
  let query = GeoQuery { lat: Some(30.5083), lng: Some(-97.6789), max_distance_km: Some(40.0) };
  let found = nearby_jobs(s.list_jobs(true).await.unwrap(), &query);
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].job.job_id, near.job_id);
  assert!(found[0].distance_km.unwrap() > 20.0);

  let query = GeoQuery { max_distance_km: Some(10.0), ..query };
  assert!(nearby_jobs(s.list_jobs(true).await.unwrap(), &query).is_empty());
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn application_thread_between_participants() {
  let s = store().await;
  let r = user(&s, Role::Recruiter, "Rita").await;
  let outsider = user(&s, Role::Recruiter, "Olga").await;
  let (c, _) = seeker(&s, "Carl", "Rust").await;
  let (d, _) = seeker(&s, "Dana", "Rust").await;
  let job = s.add_job(r.user_id, job_input("Rust")).await.unwrap();
  let app = apply_to_job(&s, &c.identity(), job.job_id, None).await.unwrap();
  let id = app.application_id;

  let err = send_message(&s, &c.identity(), id, "   ").await.unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
  for stranger in [&outsider, &d] {
    let err = send_message(&s, &stranger.identity(), id, "Hi").await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
    let err = open_thread(&s, &stranger.identity(), id).await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
  }

  send_message(&s, &c.identity(), id, " Is the role still open? ").await.unwrap();
  send_message(&s, &r.identity(), id, "Yes! Are you free Tuesday?").await.unwrap();
  assert_eq!(unread_message_count(&s, &r.identity()).await.unwrap(), 1);
  assert_eq!(unread_message_count(&s, &c.identity()).await.unwrap(), 1);

  let inbox = conversations(&s, &r.identity()).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].other_party, "Carl");
  assert_eq!(inbox[0].last_message, "Yes! Are you free Tuesday?");
  assert_eq!(inbox[0].unread_count, 1);
  assert!(conversations(&s, &outsider.identity()).await.unwrap().is_empty());

  let thread = open_thread(&s, &r.identity(), id).await.unwrap();
  assert_eq!(thread.job_title, "Backend Engineer");
  let senders: Vec<_> = thread.messages.iter().map(|m| m.sender_id).collect();
  assert_eq!(senders, vec![c.user_id, r.user_id]);
  assert_eq!(thread.messages[0].content, "Is the role still open?");
  assert!(thread.messages[0].is_read);
  assert!(!thread.messages[1].is_read);
  assert_eq!(unread_message_count(&s, &r.identity()).await.unwrap(), 0);
  assert_eq!(unread_message_count(&s, &c.identity()).await.unwrap(), 1);

  let inbox = conversations(&s, &c.identity()).await.unwrap();
  assert_eq!(inbox[0].other_party, "Acme");
  assert_eq!(inbox[0].unread_count, 1);

  update_application_status(&s, &r.identity(), id, ApplicationStatus::Interview, false, Utc::now())
    .await
    .unwrap();
  let thread = open_thread(&s, &c.identity(), id).await.unwrap();
  assert_eq!(thread.status, ApplicationStatus::Applied);
  assert_eq!(unread_message_count(&s, &c.identity()).await.unwrap(), 0);
  let thread = open_thread(&s, &r.identity(), id).await.unwrap();
  assert_eq!(thread.status, ApplicationStatus::Interview);
}
