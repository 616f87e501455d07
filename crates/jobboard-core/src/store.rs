//! The `JobBoardStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `jobboard-store-sqlite`).
//! The operations in this crate and the HTTP layer depend on this
//! abstraction, not on any concrete backend. It doubles as the identity
//! collaborator: users and their roles live behind it too.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  application::{JobApplication, NewApplication},
  identity::{NewUser, Role, User},
  job::{JobPosting, NewJob},
  messaging::{ApplicationMessage, NewMessage},
  profile::{CandidateProfile, ProfileInput},
  search::{NewSavedSearch, NotificationRecord, SavedSearch, SavedSearchQuery, SavedSearchUpdate},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`JobBoardStore::list_profiles`].
#[derive(Debug, Clone, Default)]
pub struct ProfileQuery {
  /// Restrict to profiles whose owner has this role.
  pub role:          Option<Role>,
  /// Only profiles with `updated_at` strictly after this instant.
  pub updated_after: Option<DateTime<Utc>>,
}

/// Parameters for [`JobBoardStore::list_applications`].
#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
  pub job_id:       Option<Uuid>,
  pub applicant_id: Option<Uuid>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a job-board persistence backend.
///
/// Listing methods return rows in a stable order so every computation built
/// on them is deterministic. Notification records are unique per
/// `(search_id, candidate_id)`; that constraint is the only guard against
/// two triggers announcing the same candidate twice.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait JobBoardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Create the user's profile, or overwrite it in place if one exists.
  /// `updated_at` is always set by the store.
  fn upsert_profile(
    &self,
    user_id: Uuid,
    input: ProfileInput,
  ) -> impl Future<Output = Result<CandidateProfile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Option<CandidateProfile>, Self::Error>> + Send + '_;

  fn get_profile_by_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<CandidateProfile>, Self::Error>> + Send + '_;

  /// Profiles matching `query`, most recently updated first.
  fn list_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
  ) -> impl Future<Output = Result<Vec<CandidateProfile>, Self::Error>> + Send + 'a;

  // ── Jobs ──────────────────────────────────────────────────────────────

  fn add_job(
    &self,
    recruiter_id: Uuid,
    input: NewJob,
  ) -> impl Future<Output = Result<JobPosting, Self::Error>> + Send + '_;

  fn get_job(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<JobPosting>, Self::Error>> + Send + '_;

  /// Replace a job's editable fields. Returns `None` if the job is unknown.
  fn update_job(
    &self,
    id: Uuid,
    input: NewJob,
    is_active: bool,
  ) -> impl Future<Output = Result<Option<JobPosting>, Self::Error>> + Send + '_;

  /// Returns `false` if the job did not exist.
  fn delete_job(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Jobs, newest first.
  fn list_jobs(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<JobPosting>, Self::Error>> + Send + '_;

  // ── Saved searches ────────────────────────────────────────────────────

  fn add_saved_search(
    &self,
    input: NewSavedSearch,
  ) -> impl Future<Output = Result<SavedSearch, Self::Error>> + Send + '_;

  fn get_saved_search(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SavedSearch>, Self::Error>> + Send + '_;

  fn list_saved_searches<'a>(
    &'a self,
    query: &'a SavedSearchQuery,
  ) -> impl Future<Output = Result<Vec<SavedSearch>, Self::Error>> + Send + 'a;

  /// Apply the set parts of `update`. Returns `None` if the search is unknown.
  fn update_saved_search(
    &self,
    id: Uuid,
    update: SavedSearchUpdate,
  ) -> impl Future<Output = Result<Option<SavedSearch>, Self::Error>> + Send + '_;

  fn set_last_notified(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Lower `last_notified` to `at` if it is currently later. Never moves the
  /// mark forwards; a search that has no mark yet is left alone.
  fn rewind_last_notified(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a search together with its notification records. Returns `false`
  /// if the search did not exist.
  fn delete_saved_search(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Notification records ──────────────────────────────────────────────

  /// Insert the record for `(search_id, candidate_id)`.
  ///
  /// Returns `None`, not an error, when the pair is already recorded.
  fn record_notification(
    &self,
    search_id: Uuid,
    candidate_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<NotificationRecord>, Self::Error>> + Send + '_;

  /// Withdraw a record whose delivery failed. Returns `false` if absent.
  fn forget_notification(
    &self,
    search_id: Uuid,
    candidate_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_notifications(
    &self,
    search_id: Uuid,
  ) -> impl Future<Output = Result<Vec<NotificationRecord>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// Returns `None` when the applicant already applied to this job.
  fn add_application(
    &self,
    input: NewApplication,
  ) -> impl Future<Output = Result<Option<JobApplication>, Self::Error>> + Send + '_;

  fn get_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<JobApplication>, Self::Error>> + Send + '_;

  /// Persist the status, rejection reason and timestamps of `application`.
  fn save_application<'a>(
    &'a self,
    application: &'a JobApplication,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Applications, most recent first.
  fn list_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> impl Future<Output = Result<Vec<JobApplication>, Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  fn add_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<ApplicationMessage, Self::Error>> + Send + '_;

  /// An application's messages, oldest first.
  fn list_messages(
    &self,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ApplicationMessage>, Self::Error>> + Send + '_;

  /// Mark every message in the thread not sent by `reader_id` as read.
  /// Returns how many changed.
  fn mark_messages_read(
    &self,
    application_id: Uuid,
    reader_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Unread messages addressed to `user_id` across every application they
  /// take part in, as applicant or as the job's recruiter.
  fn count_unread_messages(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
