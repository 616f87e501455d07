//! Per-application message threads between a recruiter and an applicant.
//!
//! Only the two participants of an application may read or write its
//! thread: the applicant, and the recruiter who owns the job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  application::{ApplicationStatus, JobApplication},
  identity::{Identity, Role},
  job::JobPosting,
  profile::excerpt,
  store::{ApplicationQuery, JobBoardStore},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationMessage {
  pub message_id:     Uuid,
  pub application_id: Uuid,
  pub sender_id:      Uuid,
  pub content:        String,
  pub created_at:     DateTime<Utc>,
  pub is_read:        bool,
}

/// Input to [`JobBoardStore::add_message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub application_id: Uuid,
  pub sender_id:      Uuid,
  pub content:        String,
}

/// A thread as one participant sees it.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
  pub application_id: Uuid,
  pub job_title:      String,
  /// The status this participant may see: the actual one for the recruiter,
  /// the published one for the applicant.
  pub status:         ApplicationStatus,
  pub messages:       Vec<ApplicationMessage>,
}

/// One line of a participant's inbox.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
  pub application_id:  Uuid,
  pub job_title:       String,
  /// The applicant's name for a recruiter; the company for an applicant.
  pub other_party:     String,
  pub last_message:    String,
  pub last_message_at: DateTime<Utc>,
  pub unread_count:    usize,
}

const LAST_MESSAGE_PREVIEW_LEN: usize = 50;

// ─── Guards ──────────────────────────────────────────────────────────────────

/// Load an application and its job, failing unless `identity` takes part.
async fn participant_of<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
) -> Result<(JobApplication, JobPosting)> {
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

  let takes_part = match identity.role {
    Role::Recruiter => job.recruiter_id == identity.user_id,
    Role::JobSeeker => application.applicant_id == identity.user_id,
  };
  if !takes_part {
    return Err(Error::Unauthorized(
      "only the applicant and the job's recruiter may use this thread".into(),
    ));
  }
  Ok((application, job))
}

fn visible_status(identity: &Identity, application: &JobApplication) -> ApplicationStatus {
  match identity.role {
    Role::Recruiter => *application.status.actual(),
    Role::JobSeeker => *application.status.published(),
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Post `content` to an application's thread.
pub async fn send_message<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
  content: &str,
) -> Result<ApplicationMessage> {
  let content = content.trim();
  if content.is_empty() {
    return Err(Error::Validation("message cannot be empty".into()));
  }
  participant_of(store, identity, application_id).await?;

  let message = store
    .add_message(NewMessage {
      application_id,
      sender_id: identity.user_id,
      content: content.to_owned(),
    })
    .await
    .map_err(Error::store)?;
  info!(%application_id, sender_id = %identity.user_id, "message sent");
  Ok(message)
}

/// Open a thread: everything the other participant sent is marked read, then
/// the whole thread is returned oldest first.
pub async fn open_thread<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  application_id: Uuid,
) -> Result<Thread> {
  let (application, job) = participant_of(store, identity, application_id).await?;
  store
    .mark_messages_read(application_id, identity.user_id)
    .await
    .map_err(Error::store)?;
  let messages = store
    .list_messages(application_id)
    .await
    .map_err(Error::store)?;
  Ok(Thread {
    application_id,
    job_title: job.title,
    status: visible_status(identity, &application),
    messages,
  })
}

/// Unread messages waiting for the requester across all their threads.
pub async fn unread_message_count<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
) -> Result<usize> {
  store
    .count_unread_messages(identity.user_id)
    .await
    .map_err(Error::store)
}

/// Every thread the requester takes part in that has at least one message,
/// most recently active first.
pub async fn conversations<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
) -> Result<Vec<Conversation>> {
  // (application, job title, other party)
  let mut threads: Vec<(JobApplication, String, String)> = Vec::new();
  match identity.role {
    Role::Recruiter => {
      let jobs = store.list_jobs(false).await.map_err(Error::store)?;
      let mut names: HashMap<Uuid, String> = HashMap::new();
      for job in jobs.into_iter().filter(|j| j.recruiter_id == identity.user_id) {
        let applications = store
          .list_applications(&ApplicationQuery { job_id: Some(job.job_id), applicant_id: None })
          .await
          .map_err(Error::store)?;
        for application in applications {
          let name = match names.get(&application.applicant_id) {
            Some(name) => name.clone(),
            None => {
              let name = store
                .get_user(application.applicant_id)
                .await
                .map_err(Error::store)?
                .map(|u| u.display_name)
                .unwrap_or_default();
              names.insert(application.applicant_id, name.clone());
              name
            }
          };
          threads.push((application, job.title.clone(), name));
        }
      }
    }
    Role::JobSeeker => {
      let applications = store
        .list_applications(&ApplicationQuery {
          job_id:       None,
          applicant_id: Some(identity.user_id),
        })
        .await
        .map_err(Error::store)?;
      for application in applications {
        let Some(job) = store.get_job(application.job_id).await.map_err(Error::store)? else {
          continue;
        };
        threads.push((application, job.title, job.company));
      }
    }
  }

  let mut out = Vec::new();
  for (application, job_title, other_party) in threads {
    let messages = store
      .list_messages(application.application_id)
      .await
      .map_err(Error::store)?;
    let Some(last) = messages.last() else {
      continue;
    };
    out.push(Conversation {
      application_id: application.application_id,
      job_title,
      other_party,
      last_message: excerpt(&last.content, LAST_MESSAGE_PREVIEW_LEN),
      last_message_at: last.created_at,
      unread_count: messages
        .iter()
        .filter(|m| !m.is_read && m.sender_id != identity.user_id)
        .count(),
    });
  }
  out.sort_by(|a, b| {
    b.last_message_at
      .cmp(&a.last_message_at)
      .then_with(|| a.application_id.cmp(&b.application_id))
  });
  Ok(out)
}
