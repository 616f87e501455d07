//! Token-overlap scoring and the ranking shared by both recommenders.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::tokenize::TokenSet;

/// `|a ∩ b|`.
pub fn overlap(a: &TokenSet, b: &TokenSet) -> usize {
  // Walk the smaller set; BTreeSet lookups are logarithmic either way.
  let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
  small.iter().filter(|t| large.contains(*t)).count()
}

/// The tokens present in both sets, in sorted order.
pub fn shared(a: &TokenSet, b: &TokenSet) -> Vec<String> {
  a.intersection(b).cloned().collect()
}

/// One entry to be ranked: the item plus the keys the ordering uses.
#[derive(Debug, Clone)]
pub struct Scored<T> {
  pub item:       T,
  pub overlap:    usize,
  pub updated_at: DateTime<Utc>,
  pub id:         Uuid,
}

/// Drop zero-overlap entries and sort by overlap desc, then `updated_at`
/// desc, then id so identical inputs always produce the same order.
pub fn rank<T>(scored: impl IntoIterator<Item = Scored<T>>) -> Vec<Scored<T>> {
  let mut ranked: Vec<_> = scored.into_iter().filter(|s| s.overlap > 0).collect();
  ranked.sort_by(compare);
  ranked
}

fn compare<T>(a: &Scored<T>, b: &Scored<T>) -> Ordering {
  b.overlap
    .cmp(&a.overlap)
    .then_with(|| b.updated_at.cmp(&a.updated_at))
    .then_with(|| a.id.cmp(&b.id))
}
