//! Identities and the role/ownership guards every operation runs at entry.
//!
//! There is no ambient "current user": callers resolve an [`Identity`] once
//! per request and pass it into each operation explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Which side of the board a user is on.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Recruiter,
  JobSeeker,
}

/// A persisted account as known to the identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub role:         Role,
  pub display_name: String,
  pub email:        String,
  pub created_at:   DateTime<Utc>,
}

impl User {
  pub fn identity(&self) -> Identity {
    Identity { user_id: self.user_id, role: self.role }
  }
}

/// Input to [`crate::store::JobBoardStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub role:         Role,
  pub display_name: String,
  pub email:        String,
}

/// The authenticated requester of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Identity {
  pub fn new(user_id: Uuid, role: Role) -> Self { Self { user_id, role } }

  /// Fail with [`Error::Unauthorized`] unless the identity has `role`.
  pub fn require_role(&self, role: Role) -> Result<()> {
    if self.role == role {
      Ok(())
    } else {
      Err(Error::Unauthorized(format!("requires the {role} role")))
    }
  }

  /// Fail with [`Error::Unauthorized`] unless the identity is `owner_id`.
  pub fn require_owner(&self, owner_id: Uuid, what: &str) -> Result<()> {
    if self.user_id == owner_id {
      Ok(())
    } else {
      Err(Error::Unauthorized(format!("{what} belongs to another user")))
    }
  }
}
