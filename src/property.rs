//! Named build properties and `$(name)` expansion.
//!
//! A [`PropertyStore`] is scoped to exactly one (project, configuration)
//! evaluation: it is seeded before reading a project file, mutated
//! incrementally while the file (and anything it imports) is read, and
//! read-only afterwards.

use std::collections::HashMap;

use crate::condition;
use crate::error::Result;

/// A case-sensitive name → string-value map with `$(name)` expansion.
///
/// There are no implicit defaults: an undefined name is reported through the
/// caller's `on_missing` hook during expansion, never silently invented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    values: HashMap<String, String>,
}

impl PropertyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property. `None` when the name was never set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Look up a property, treating an unset name as the empty string.
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Set a property, overwriting any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Number of properties currently stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no properties at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `$(name)` occurrence in `text` with the stored value.
    ///
    /// When `name` is undefined, `on_missing(name)` is invoked exactly once
    /// for that occurrence and its return value is substituted — callers
    /// typically log the name and return an empty string. Matching is
    /// non-greedy (up to the first `)`), multiple placeholders per text are
    /// handled, and substituted text is *not* re-expanded.
    ///
    /// A `$(` with no closing `)` is left as literal text, and so is an
    /// empty `$()` reference.
    pub fn expand<F>(&self, text: &str, mut on_missing: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'(') {
                result.push(c);
                continue;
            }
            chars.next(); // consume '('

            let mut name = String::new();
            let mut terminated = false;
            for ch in chars.by_ref() {
                if ch == ')' {
                    terminated = true;
                    break;
                }
                name.push(ch);
            }
            if !terminated {
                result.push_str("$(");
                result.push_str(&name);
                break;
            }
            // A reference needs at least one character of name; "$()" is
            // plain text.
            if name.is_empty() {
                result.push_str("$()");
                continue;
            }

            match self.values.get(&name) {
                Some(value) => result.push_str(value),
                None => result.push_str(&on_missing(&name)),
            }
        }

        result
    }

    /// Expand `$(name)` references in `text` (undefined names become empty)
    /// and evaluate the result as a condition.
    pub fn evaluate_condition(&self, text: &str) -> Result<bool> {
        let expanded = self.expand(text, |_| String::new());
        condition::evaluate_text(&expanded)
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
