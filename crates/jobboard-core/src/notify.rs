//! The notification differ and the batch that acts on its output.
//!
//! A saved search's owner hears about each matching candidate at most once.
//! Two triggers feed this module: the batch run over every enabled search
//! ([`process_all_notifications`]) and the profile-save hook
//! ([`notify_on_profile_change`]). They may race on the same pair; the
//! store's uniqueness constraint on notification records decides, and the
//! loser sees "already notified".
//!
//! A record is written before delivery and withdrawn if delivery fails. A
//! withdrawn record also pulls the search's `last_notified` back below the
//! candidate, whichever trigger wrote the mark, so the next batch retries.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Role, User},
  profile::{CandidateProfile, ProfileField, excerpt},
  search::{SavedSearch, SavedSearchQuery, execute},
  store::{JobBoardStore, ProfileQuery},
};

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Everything a notifier needs to tell a recruiter about one candidate.
#[derive(Debug, Clone)]
pub struct Notice<'a> {
  pub recruiter:      &'a User,
  pub search:         &'a SavedSearch,
  pub candidate:      &'a User,
  pub profile:        &'a CandidateProfile,
  pub matched_fields: Vec<ProfileField>,
}

/// Delivery collaborator (e-mail, chat, log). Only called once the
/// notification record for the pair exists.
pub trait Notifier: Send + Sync {
  fn notify<'a>(
    &'a self,
    notice: &'a Notice<'a>,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// A rendered notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

const SKILLS_PREVIEW_LEN: usize = 200;

/// Render the e-mail a recruiter receives. Only visible profile fields are
/// quoted.
pub fn compose_message(notice: &Notice<'_>) -> Message {
  let search = &notice.search.name;
  let mut lines = vec![
    format!("Hello {},", notice.recruiter.display_name),
    String::new(),
    format!("A new candidate matches your saved search \"{search}\":"),
    String::new(),
    format!("Candidate: {}", notice.candidate.display_name),
  ];
  if let Some(headline) = notice.profile.visible_field(ProfileField::Headline) {
    lines.push(format!("Headline: {headline}"));
  }
  if let Some(location) = notice.profile.visible_field(ProfileField::Location) {
    lines.push(format!("Location: {location}"));
  }
  if let Some(skills) = notice.profile.visible_field(ProfileField::Skills) {
    lines.push(format!("Skills: {}", excerpt(skills, SKILLS_PREVIEW_LEN)));
  }
  lines.extend(
    [
      "",
      "View the full profile to learn more.",
      "",
      "To manage your saved searches and notifications, visit your dashboard.",
    ]
    .map(String::from),
  );

  Message {
    to:      notice.recruiter.email.clone(),
    subject: format!("New Candidate Match: {search}"),
    body:    lines.join("\n"),
  }
}

/// A [`Notifier`] that only logs the message it would have sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn notify<'a>(&'a self, notice: &'a Notice<'a>) -> Result<()> {
    let message = compose_message(notice);
    info!(
      to = %message.to,
      subject = %message.subject,
      "email notification would be sent"
    );
    debug!(body = %message.body);
    Ok(())
  }
}

// ─── Differ ──────────────────────────────────────────────────────────────────

/// Candidates of `pool` that `search` should announce now: current matches,
/// updated since the last completed batch, and not already recorded.
pub fn diff<'a>(
  search: &SavedSearch,
  pool: &'a [CandidateProfile],
  already_notified: &HashSet<Uuid>,
) -> Vec<&'a CandidateProfile> {
  let fresh = pool
    .iter()
    .filter(|p| search.last_notified.is_none_or(|t| p.updated_at > t));
  execute(&search.criteria, fresh)
    .into_iter()
    .filter(|p| !already_notified.contains(&p.user_id))
    .collect()
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct NotifyOptions {
  /// The run's clock; stamped on records and on `last_notified`.
  pub now:     DateTime<Utc>,
  /// Evaluate and report only: no records, no delivery, no timestamp.
  pub dry_run: bool,
}

impl NotifyOptions {
  pub fn at(now: DateTime<Utc>) -> Self { Self { now, dry_run: false } }
}

/// Outcome of one search's batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
  pub search_id:        Uuid,
  /// Users the differ selected, in evaluation order.
  pub candidates:       Vec<Uuid>,
  /// Records created and delivered.
  pub created:          usize,
  /// Lost the race to another trigger; nothing sent.
  pub already_notified: usize,
  /// Recording or delivery failed; eligible again next run.
  pub failed:           usize,
  pub dry_run:          bool,
}

enum Outcome {
  Created,
  AlreadyNotified,
  Failed,
}

async fn lookup_user<S: JobBoardStore>(store: &S, id: Uuid) -> Result<User> {
  store
    .get_user(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("user", id))
}

/// Pull `last_notified` back to just below `profile`, so a batch that
/// advanced the mark past a record that is now gone cannot skip the
/// candidate for good.
async fn rewind<S: JobBoardStore>(store: &S, search_id: Uuid, profile: &CandidateProfile) {
  let before = profile.updated_at - Duration::microseconds(1);
  if let Err(e) = store.rewind_last_notified(search_id, before).await {
    warn!(%search_id, candidate_id = %profile.user_id, error = %e, "failed to rewind last_notified");
  }
}

/// Record the pair, then deliver. A failed delivery withdraws the record and
/// rewinds the search's mark so the candidate stays eligible. Every problem
/// with one candidate ends in [`Outcome::Failed`] for that candidate only.
async fn announce<S: JobBoardStore, N: Notifier>(
  store: &S,
  notifier: &N,
  recruiter: &User,
  search: &SavedSearch,
  profile: &CandidateProfile,
  now: DateTime<Utc>,
) -> Outcome {
  let search_id = search.search_id;
  let candidate_id = profile.user_id;

  let candidate = match lookup_user(store, candidate_id).await {
    Ok(user) => user,
    Err(e) => {
      warn!(%search_id, %candidate_id, error = %e, "failed to load candidate");
      return Outcome::Failed;
    }
  };

  match store.record_notification(search_id, candidate_id, now).await {
    Ok(Some(_)) => {}
    Ok(None) => {
      debug!(%search_id, %candidate_id, "candidate already notified");
      return Outcome::AlreadyNotified;
    }
    Err(e) => {
      warn!(%search_id, %candidate_id, error = %e, "failed to record notification");
      return Outcome::Failed;
    }
  }

  let notice = Notice {
    recruiter,
    search,
    candidate: &candidate,
    profile,
    matched_fields: search.criteria.matched_fields(profile),
  };
  let Err(e) = notifier.notify(&notice).await else {
    return Outcome::Created;
  };
  warn!(%search_id, %candidate_id, error = %e, "notification delivery failed");

  match store.forget_notification(search_id, candidate_id).await {
    Ok(_) => rewind(store, search_id, profile).await,
    Err(e) => {
      warn!(%search_id, %candidate_id, error = %e, "failed to withdraw notification record");
    }
  }
  Outcome::Failed
}

/// Records seen during a batch may belong to a delivery still in flight on
/// the other trigger. Any that have been withdrawn since must not stay
/// hidden behind the mark the batch just wrote.
async fn recheck_contested<S: JobBoardStore>(
  store: &S,
  search_id: Uuid,
  contested: &[&CandidateProfile],
) {
  let recorded: HashSet<Uuid> = match store.list_notifications(search_id).await {
    Ok(records) => records.into_iter().map(|r| r.candidate_id).collect(),
    Err(e) => {
      warn!(%search_id, error = %e, "failed to re-read notification records");
      return;
    }
  };
  for profile in contested.iter().filter(|p| !recorded.contains(&p.user_id)) {
    debug!(%search_id, candidate_id = %profile.user_id, "record withdrawn during batch");
    rewind(store, search_id, profile).await;
  }
}

async fn run_batch<S: JobBoardStore, N: Notifier>(
  store: &S,
  notifier: &N,
  search: &SavedSearch,
  options: NotifyOptions,
) -> Result<NotificationReport> {
  let search_id = search.search_id;
  let pool = store
    .list_profiles(&ProfileQuery {
      role:          Some(Role::JobSeeker),
      updated_after: search.last_notified,
    })
    .await
    .map_err(Error::store)?;
  let already: HashSet<Uuid> = store
    .list_notifications(search_id)
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|r| r.candidate_id)
    .collect();

  let fresh = diff(search, &pool, &already);
  let mut report = NotificationReport {
    search_id,
    candidates: fresh.iter().map(|p| p.user_id).collect(),
    dry_run: options.dry_run,
    ..Default::default()
  };

  if options.dry_run {
    info!(%search_id, would_notify = fresh.len(), "dry run");
    return Ok(report);
  }
  if fresh.is_empty() {
    debug!(%search_id, "no new candidates");
  }

  let mut contested: Vec<&CandidateProfile> = execute(&search.criteria, &pool)
    .into_iter()
    .filter(|p| already.contains(&p.user_id))
    .collect();

  let recruiter = lookup_user(store, search.recruiter_id).await?;
  let mut earliest_failure: Option<DateTime<Utc>> = None;
  for profile in fresh {
    match announce(store, notifier, &recruiter, search, profile, options.now).await {
      Outcome::Created => report.created += 1,
      Outcome::AlreadyNotified => {
        report.already_notified += 1;
        contested.push(profile);
      }
      Outcome::Failed => {
        report.failed += 1;
        earliest_failure = Some(match earliest_failure {
          Some(t) => t.min(profile.updated_at),
          None => profile.updated_at,
        });
      }
    }
  }

  // Failed candidates must still pass the `updated_at > last_notified`
  // filter next run.
  let mark = match earliest_failure {
    None => options.now,
    Some(t) => {
      let before = t - Duration::microseconds(1);
      search.last_notified.map_or(before, |prev| prev.max(before))
    }
  };
  store
    .set_last_notified(search_id, mark)
    .await
    .map_err(Error::store)?;
  if !contested.is_empty() {
    recheck_contested(store, search_id, &contested).await;
  }

  info!(
    %search_id,
    created = report.created,
    already_notified = report.already_notified,
    failed = report.failed,
    "saved search processed"
  );
  Ok(report)
}

/// Run the differ for one saved search and notify its owner about every new
/// candidate. `report.created` is the number of new notification records.
pub async fn process_notifications<S: JobBoardStore, N: Notifier>(
  store: &S,
  notifier: &N,
  search_id: Uuid,
  options: NotifyOptions,
) -> Result<NotificationReport> {
  let search = store
    .get_saved_search(search_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("saved search", search_id))?;
  run_batch(store, notifier, &search, options).await
}

/// [`process_notifications`] for every search with notifications enabled.
pub async fn process_all_notifications<S: JobBoardStore, N: Notifier>(
  store: &S,
  notifier: &N,
  options: NotifyOptions,
) -> Result<Vec<NotificationReport>> {
  let searches = store
    .list_saved_searches(&SavedSearchQuery {
      recruiter_id:         None,
      notification_enabled: Some(true),
    })
    .await
    .map_err(Error::store)?;
  info!(searches = searches.len(), dry_run = options.dry_run, "processing saved searches");

  let mut reports = Vec::with_capacity(searches.len());
  for search in &searches {
    reports.push(run_batch(store, notifier, search, options).await?);
  }
  Ok(reports)
}

/// Profile-save hook: announce `profile_id` to every enabled search it now
/// matches. Leaves `last_notified` alone; that mark belongs to the batch.
/// Returns the number of notifications created.
pub async fn notify_on_profile_change<S: JobBoardStore, N: Notifier>(
  store: &S,
  notifier: &N,
  profile_id: Uuid,
  now: DateTime<Utc>,
) -> Result<usize> {
  let profile = store
    .get_profile(profile_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("profile", profile_id))?;
  let owner = lookup_user(store, profile.user_id).await?;
  if owner.role != Role::JobSeeker {
    return Ok(0);
  }

  let searches = store
    .list_saved_searches(&SavedSearchQuery {
      recruiter_id:         None,
      notification_enabled: Some(true),
    })
    .await
    .map_err(Error::store)?;

  let mut created = 0;
  for search in searches.iter().filter(|s| s.criteria.matches(&profile)) {
    let recruiter = match lookup_user(store, search.recruiter_id).await {
      Ok(user) => user,
      Err(e) => {
        warn!(search_id = %search.search_id, error = %e, "failed to load search owner");
        continue;
      }
    };
    if let Outcome::Created = announce(store, notifier, &recruiter, search, &profile, now).await {
      created += 1;
    }
  }
  Ok(created)
}
