//! Candidate profiles and their per-field privacy mask.
//!
//! Every recruiter-facing read of a profile goes through
//! [`CandidateProfile::visible_field`] or [`CandidateProfile::redacted`];
//! nothing else consults the mask.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The free-text fields of a profile, each with its own visibility bit.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProfileField {
  Headline,
  Skills,
  Education,
  WorkHistory,
  Links,
  Location,
  Projects,
}

impl ProfileField {
  const fn bit(self) -> u8 { 1 << (self as u8) }
}

// ─── Visibility ──────────────────────────────────────────────────────────────

/// A capability mask: one bit per [`ProfileField`], set when recruiters may
/// see that field.
///
/// Serialises as the list of visible field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<ProfileField>", from = "Vec<ProfileField>")]
pub struct Visibility(u8);

impl Visibility {
  const ALL_BITS: u8 = (1 << 7) - 1;

  pub const fn all() -> Self { Self(Self::ALL_BITS) }

  pub const fn none() -> Self { Self(0) }

  /// Rebuild from a stored mask; unknown high bits are dropped.
  pub const fn from_bits(bits: u8) -> Self { Self(bits & Self::ALL_BITS) }

  pub const fn bits(self) -> u8 { self.0 }

  pub const fn is_visible(self, field: ProfileField) -> bool {
    self.0 & field.bit() != 0
  }

  pub fn set(&mut self, field: ProfileField, visible: bool) {
    if visible {
      self.0 |= field.bit();
    } else {
      self.0 &= !field.bit();
    }
  }

  /// Builder-style [`Visibility::set`].
  #[must_use]
  pub fn with(mut self, field: ProfileField, visible: bool) -> Self {
    self.set(field, visible);
    self
  }
}

impl Default for Visibility {
  fn default() -> Self { Self::all() }
}

impl From<Vec<ProfileField>> for Visibility {
  fn from(fields: Vec<ProfileField>) -> Self {
    fields
      .into_iter()
      .fold(Self::none(), |v, f| v.with(f, true))
  }
}

impl From<Visibility> for Vec<ProfileField> {
  fn from(v: Visibility) -> Self {
    ProfileField::iter().filter(|f| v.is_visible(*f)).collect()
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A job seeker's (or recruiter's) profile. At most one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
  pub profile_id:   Uuid,
  pub user_id:      Uuid,
  pub headline:     String,
  pub skills:       String,
  pub education:    String,
  pub work_history: String,
  pub links:        String,
  pub location:     String,
  pub projects:     String,
  pub visibility:   Visibility,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl CandidateProfile {
  /// Raw field text, regardless of visibility. Owner-facing only.
  pub fn field(&self, field: ProfileField) -> &str {
    match field {
      ProfileField::Headline => &self.headline,
      ProfileField::Skills => &self.skills,
      ProfileField::Education => &self.education,
      ProfileField::WorkHistory => &self.work_history,
      ProfileField::Links => &self.links,
      ProfileField::Location => &self.location,
      ProfileField::Projects => &self.projects,
    }
  }

  fn field_mut(&mut self, field: ProfileField) -> &mut String {
    match field {
      ProfileField::Headline => &mut self.headline,
      ProfileField::Skills => &mut self.skills,
      ProfileField::Education => &mut self.education,
      ProfileField::WorkHistory => &mut self.work_history,
      ProfileField::Links => &mut self.links,
      ProfileField::Location => &mut self.location,
      ProfileField::Projects => &mut self.projects,
    }
  }

  /// Field text as a recruiter may see it: `None` when hidden or blank.
  pub fn visible_field(&self, field: ProfileField) -> Option<&str> {
    if !self.visibility.is_visible(field) {
      return None;
    }
    let text = self.field(field);
    (!text.trim().is_empty()).then_some(text)
  }

  /// A copy with every hidden field blanked; what leaves the crate towards
  /// recruiters.
  pub fn redacted(&self) -> Self {
    let mut out = self.clone();
    for f in ProfileField::iter().filter(|f| !self.visibility.is_visible(*f)) {
      out.field_mut(f).clear();
    }
    out
  }
}

// ─── ProfileInput ────────────────────────────────────────────────────────────

/// Input to [`crate::store::JobBoardStore::upsert_profile`]. Timestamps and
/// identifiers are assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
  #[serde(default)]
  pub headline:     String,
  #[serde(default)]
  pub skills:       String,
  #[serde(default)]
  pub education:    String,
  #[serde(default)]
  pub work_history: String,
  #[serde(default)]
  pub links:        String,
  #[serde(default)]
  pub location:     String,
  #[serde(default)]
  pub projects:     String,
  #[serde(default)]
  pub visibility:   Visibility,
}

impl ProfileInput {
  /// Trim the required fields and reject blanks and non-http(s) links.
  pub fn validate(mut self) -> Result<Self> {
    for (name, value) in [
      ("headline", &mut self.headline),
      ("skills", &mut self.skills),
      ("education", &mut self.education),
      ("work history", &mut self.work_history),
    ] {
      let trimmed = value.trim();
      if trimmed.is_empty() {
        return Err(Error::Validation(format!("{name} is required")));
      }
      *value = trimmed.to_owned();
    }

    for link in self.links.lines().map(str::trim).filter(|l| !l.is_empty()) {
      if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(Error::Validation(format!(
          "links must be full URLs starting with http:// or https://, found {link:?}"
        )));
      }
    }

    Ok(self)
  }
}

/// Truncate `text` to `max_chars` characters, appending `...` when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((cut, _)) => format!("{}...", &text[..cut]),
    None => text.to_owned(),
  }
}
