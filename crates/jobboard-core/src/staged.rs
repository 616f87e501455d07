//! A value with a separately published view.
//!
//! The owner edits the actual value freely; other parties only ever see the
//! published value, which catches up when the owner explicitly promotes it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staged<T> {
  actual:    T,
  published: T,
}

impl<T: Clone + PartialEq> Staged<T> {
  /// A freshly created value is published as-is.
  pub fn new(value: T) -> Self {
    Self { published: value.clone(), actual: value }
  }

  /// Rebuild from stored halves.
  pub fn from_parts(actual: T, published: T) -> Self { Self { actual, published } }

  pub fn actual(&self) -> &T { &self.actual }

  pub fn published(&self) -> &T { &self.published }

  /// Whether the published view is current.
  pub fn is_published(&self) -> bool { self.actual == self.published }

  /// Change the actual value only.
  pub fn stage(&mut self, value: T) { self.actual = value; }

  /// Make the actual value visible. Returns `false` if nothing changed.
  pub fn promote(&mut self) -> bool {
    if self.is_published() {
      return false;
    }
    self.published = self.actual.clone();
    true
  }

  /// [`Staged::stage`], followed by [`Staged::promote`] when `publish` is set.
  pub fn set(&mut self, value: T, publish: bool) {
    self.stage(value);
    if publish {
      self.promote();
    }
  }
}
