//! JSON REST API for the job board.
//!
//! Exposes an axum [`Router`] backed by any
//! [`jobboard_core::store::JobBoardStore`] and
//! [`jobboard_core::notify::Notifier`]. The requester is named by the
//! `x-user-id` header; TLS and session handling are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", jobboard_api::api_router(store.clone(), notifier.clone()))
//! ```

pub mod applications;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod messages;
pub mod profiles;
pub mod searches;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use jobboard_core::{notify::Notifier, store::JobBoardStore};

pub use error::ApiError;
pub use identity::{CurrentUser, USER_HEADER};

/// Shared state threaded through all handlers.
pub struct ApiState<S, N> {
  pub store:    Arc<S>,
  pub notifier: Arc<N>,
}

impl<S, N> Clone for ApiState<S, N> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), notifier: self.notifier.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(store: Arc<S>, notifier: Arc<N>) -> Router<()>
where
  S: JobBoardStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S, N>))
    .route("/me", get(users::me))
    // Profiles
    .route("/profile", get(profiles::get_mine::<S, N>).put(profiles::put_mine::<S, N>))
    .route("/profiles/{id}", get(profiles::get_one::<S, N>))
    // Jobs
    .route("/jobs", get(jobs::list::<S, N>).post(jobs::create::<S, N>))
    .route("/jobs/geo", get(jobs::geo::<S, N>))
    .route(
      "/jobs/{id}",
      get(jobs::get_one::<S, N>)
        .put(jobs::update::<S, N>)
        .delete(jobs::delete_one::<S, N>),
    )
    .route("/jobs/{id}/candidates", get(jobs::candidates::<S, N>))
    .route("/jobs/{id}/apply", post(jobs::apply::<S, N>))
    .route("/jobs/{id}/applications", get(jobs::applications::<S, N>))
    .route("/recommendations/jobs", get(jobs::recommended::<S, N>))
    // Saved searches
    .route("/searches", get(searches::list::<S, N>).post(searches::create::<S, N>))
    .route(
      "/searches/{id}",
      get(searches::get_one::<S, N>)
        .put(searches::update::<S, N>)
        .delete(searches::delete_one::<S, N>),
    )
    .route("/searches/{id}/results", get(searches::results::<S, N>))
    .route("/searches/{id}/notify", post(searches::notify::<S, N>))
    // Applications
    .route("/applications", get(applications::mine::<S, N>))
    .route("/applications/publish", post(applications::publish::<S, N>))
    .route("/applications/{id}/status", put(applications::set_status::<S, N>))
    .route("/applications/{id}/reject", post(applications::reject::<S, N>))
    // Messages
    .route(
      "/applications/{id}/messages",
      get(messages::thread::<S, N>).post(messages::send::<S, N>),
    )
    .route("/messages/unread", get(messages::unread::<S, N>))
    .route("/conversations", get(messages::inbox::<S, N>))
    .with_state(ApiState { store, notifier })
}

// ─── Integration tests ───────────────────────────────────────────────────────
