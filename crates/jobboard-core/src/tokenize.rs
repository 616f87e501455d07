//! Free-text skill fields → normalised token sets.

use std::collections::BTreeSet;

/// A set of lowercase tokens. Ordered so that anything derived from it
/// (matched-skill lists, debug output) is deterministic.
pub type TokenSet = BTreeSet<String>;

fn is_separator(c: char) -> bool {
  matches!(c, ',' | ';' | '/') || c.is_whitespace()
}

/// Split `text` on commas, semicolons, slashes and whitespace runs, lowercase
/// every piece and drop the empty ones.
pub fn tokenize(text: &str) -> TokenSet {
  text
    .split(is_separator)
    .filter(|t| !t.is_empty())
    .map(str::to_lowercase)
    .collect()
}
