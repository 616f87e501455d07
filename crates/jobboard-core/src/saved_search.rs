//! Recruiter-facing operations on saved searches.

use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Identity, Role},
  profile::CandidateProfile,
  search::{NewSavedSearch, SavedSearch, SavedSearchQuery, SavedSearchUpdate, execute},
  store::{JobBoardStore, ProfileQuery},
};

async fn owned_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  search_id: Uuid,
) -> Result<SavedSearch> {
  identity.require_role(Role::Recruiter)?;
  let search = store
    .get_saved_search(search_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("saved search", search_id))?;
  identity.require_owner(search.recruiter_id, "saved search")?;
  Ok(search)
}

/// Save a search for the requesting recruiter. The owner is always the
/// requester, whatever `input.recruiter_id` says.
pub async fn create_saved_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  input: NewSavedSearch,
) -> Result<SavedSearch> {
  identity.require_role(Role::Recruiter)?;
  let input = NewSavedSearch {
    recruiter_id: identity.user_id,
    name: input.name.trim().to_owned(),
    ..input
  };
  input.validate()?;
  let search = store.add_saved_search(input).await.map_err(Error::store)?;
  info!(search_id = %search.search_id, recruiter_id = %search.recruiter_id, "saved search created");
  Ok(search)
}

pub async fn get_saved_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  search_id: Uuid,
) -> Result<SavedSearch> {
  owned_search(store, identity, search_id).await
}

/// The requester's own saved searches.
pub async fn list_saved_searches<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
) -> Result<Vec<SavedSearch>> {
  identity.require_role(Role::Recruiter)?;
  store
    .list_saved_searches(&SavedSearchQuery {
      recruiter_id:         Some(identity.user_id),
      notification_enabled: None,
    })
    .await
    .map_err(Error::store)
}

pub async fn update_saved_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  search_id: Uuid,
  mut update: SavedSearchUpdate,
) -> Result<SavedSearch> {
  owned_search(store, identity, search_id).await?;
  if let Some(name) = update.name.as_mut() {
    *name = name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::Validation("name is required".into()));
    }
  }
  if let Some(criteria) = &update.criteria {
    criteria.validate()?;
  }
  store
    .update_saved_search(search_id, update)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found("saved search", search_id))
}

/// Delete a search and, with it, its notification history.
pub async fn delete_saved_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  search_id: Uuid,
) -> Result<()> {
  owned_search(store, identity, search_id).await?;
  if !store.delete_saved_search(search_id).await.map_err(Error::store)? {
    return Err(Error::not_found("saved search", search_id));
  }
  info!(%search_id, "saved search deleted");
  Ok(())
}

/// Run a saved search now over every job seeker profile. Returned profiles
/// are redacted.
pub async fn run_saved_search<S: JobBoardStore>(
  store: &S,
  identity: &Identity,
  search_id: Uuid,
) -> Result<Vec<CandidateProfile>> {
  let search = owned_search(store, identity, search_id).await?;
  let pool = store
    .list_profiles(&ProfileQuery { role: Some(Role::JobSeeker), updated_after: None })
    .await
    .map_err(Error::store)?;
  Ok(execute(&search.criteria, &pool)
    .into_iter()
    .map(CandidateProfile::redacted)
    .collect())
}
