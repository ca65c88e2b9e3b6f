//! Project identity cache.
//!
//! Two coordinated maps back the cache: `by_unique_name` is the
//! authoritative membership (one entry per tracked project), and
//! `by_short_name` buckets identities that share a display name. A short
//! name with more than one bucket member is *ambiguous*: it stops resolving
//! on its own and callers must use the custom unique name instead.
//!
//! Invariants:
//! - every entry in `by_unique_name` appears in exactly one short-name
//!   bucket
//! - removing a bucket's last member removes the bucket
//! - ambiguity is purely a function of current membership
//!
//! The cache has no interior locking. It is owned exclusively by the
//! solution manager and mutated only on the host's serialized event
//! context; the manager's own lock is what makes `clear` atomic for
//! readers. A per-entry concurrent map cannot express the cross-map
//! invariant, which is why none is used here.

use std::collections::HashMap;

use crate::solution::project::{fold_name, ProjectHandle, ProjectNames};

/// In-memory mapping from project names to tracked identities.
#[derive(Default)]
pub(crate) struct ProjectCache {
    /// Folded unique name → handle. Authoritative membership.
    by_unique_name: HashMap<String, ProjectHandle>,
    /// Folded short name → folded unique names sharing it, insertion order.
    by_short_name: HashMap<String, Vec<String>>,
}

impl ProjectCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a project and returns the name callers should address it
    /// by: the plain short name while it is unique, the custom unique name
    /// once a sibling shares the short name.
    ///
    /// Re-adding a project with the same unique name replaces the previous
    /// entry.
    pub(crate) fn add(&mut self, handle: ProjectHandle) -> String {
        let names = handle.names().clone();
        let unique_key = fold_name(names.unique_name());
        let short_key = fold_name(names.short_name());

        if let Some(previous) = self.by_unique_name.insert(unique_key.clone(), handle) {
            self.unlink_from_bucket(previous.names(), &unique_key);
        }

        let bucket = self.by_short_name.entry(short_key).or_default();
        if !bucket.iter().any(|key| key == &unique_key) {
            bucket.push(unique_key);
        }

        if bucket.len() > 1 {
            names.custom_unique_name().to_string()
        } else {
            names.short_name().to_string()
        }
    }

    /// Removes the project addressed by `name` (any addressable form) and
    /// returns its handle. `None` when nothing matched.
    pub(crate) fn remove(&mut self, name: &str) -> Option<ProjectHandle> {
        let unique_key = self
            .find(name)
            .map(|handle| fold_name(handle.unique_name()))?;
        let handle = self.by_unique_name.remove(&unique_key)?;
        self.unlink_from_bucket(handle.names(), &unique_key);
        Some(handle)
    }

    /// Looks a project up by any addressable form.
    ///
    /// Resolution precedence: unique name, then short name, then custom
    /// unique name, then full path. An ambiguous short name resolves to
    /// nothing even when it happens to equal some project's custom unique
    /// name (a top-level project's custom unique name is just its short
    /// name): once "A" is shared, only the qualified forms address either
    /// project.
    pub(crate) fn find(&self, name: &str) -> Option<&ProjectHandle> {
        if let Some(handle) = self.get_by_unique_name(name) {
            return Some(handle);
        }

        let key = fold_name(name);
        if let Some(bucket) = self.by_short_name.get(&key) {
            return match bucket.as_slice() {
                [only] => self.by_unique_name.get(only),
                _ => None,
            };
        }

        // Custom unique names and paths are rare lookup forms; solutions
        // are small enough that a scan beats maintaining two more indexes.
        self.by_unique_name.values().find(|handle| {
            let names = handle.names();
            fold_name(names.custom_unique_name()) == key
                || fold_name(&names.full_path().to_string_lossy()) == key
        })
    }

    /// Identity snapshot for the project addressed by `name`.
    pub(crate) fn find_names(&self, name: &str) -> Option<ProjectNames> {
        self.find(name).map(|handle| handle.names().clone())
    }

    /// Strict lookup by host unique name.
    pub(crate) fn get_by_unique_name(&self, unique_name: &str) -> Option<&ProjectHandle> {
        self.by_unique_name.get(&fold_name(unique_name))
    }

    /// Lookup by short name. `None` when the name is unknown *or*
    /// ambiguous: an ambiguous short name does not resolve, callers must
    /// use the qualified name.
    pub(crate) fn get_by_short_name(&self, short_name: &str) -> Option<&ProjectHandle> {
        let bucket = self.by_short_name.get(&fold_name(short_name))?;
        match bucket.as_slice() {
            [only] => self.by_unique_name.get(only),
            _ => None,
        }
    }

    /// Whether `name` currently addresses a tracked project.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Whether more than one tracked project shares `short_name`.
    pub(crate) fn is_ambiguous(&self, short_name: &str) -> bool {
        self.by_short_name
            .get(&fold_name(short_name))
            .is_some_and(|bucket| bucket.len() > 1)
    }

    /// Snapshot of all tracked projects, ordered by unique name.
    pub(crate) fn projects(&self) -> Vec<ProjectHandle> {
        let mut keys: Vec<&String> = self.by_unique_name.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.by_unique_name.get(key))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_unique_name.len()
    }

    /// Discards both maps. The owning manager holds its write lock across
    /// this call, so readers never observe a partially cleared cache.
    pub(crate) fn clear(&mut self) {
        self.by_unique_name.clear();
        self.by_short_name.clear();
    }

    fn unlink_from_bucket(&mut self, names: &ProjectNames, unique_key: &str) {
        let short_key = fold_name(names.short_name());
        if let Some(bucket) = self.by_short_name.get_mut(&short_key) {
            bucket.retain(|key| key != unique_key);
            if bucket.is_empty() {
                self.by_short_name.remove(&short_key);
            }
        }
    }
}
