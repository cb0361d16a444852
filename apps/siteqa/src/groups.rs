//! Deduplicating multi-map used by both aggregators.
//!
//! `Groups<G>` maps a key (violation id, message type) to a group value whose
//! fields are `OrderedSet`s. Merging a record either initializes the group or
//! extends its sets; duplicates are absorbed by the set, so the at-most-once
//! invariant holds structurally.

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Insertion-ordered set serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderedSet(IndexSet<String>);

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` unless already present. Returns whether it was new.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Keyed groups in first-seen key order.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Groups<G>(IndexMap<String, G>);

impl<G> Default for Groups<G> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<G> Groups<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the group under `key`.
    ///
    /// `init` runs only for the first observation of `key`; `update` runs
    /// for every observation, including the first.
    pub fn merge<I, U>(&mut self, key: &str, init: I, update: U)
    where
        I: FnOnce() -> G,
        U: FnOnce(&mut G),
    {
        let group = match self.0.entry(key.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(init()),
        };
        update(group);
    }

    pub fn get(&self, key: &str) -> Option<&G> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &G)> {
        self.0.iter().map(|(k, g)| (k.as_str(), g))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
