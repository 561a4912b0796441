//! Name-unique, ordered directory listings.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::entry::{Conflict, Entry};
use crate::error::VfsError;

/// Name of the slot holding a directory's own index content.
pub const INDEX_NAME: &str = "";

/// Resolved contents of one directory URI, ordered by name.
///
/// Only the resolver inserts; callers get a read-only view.
#[derive(Clone, Debug)]
pub struct Listing {
    uri: String,
    entries: BTreeMap<String, Entry>,
}

impl Listing {
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Directory URI this listing was resolved for.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Entry stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Entry for the directory's own index.
    pub fn index(&self) -> Option<&Entry> {
        self.get(INDEX_NAME)
    }

    /// Names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `entry` under `name`, applying the collision rules.
    ///
    /// - directories under the same name coalesce
    /// - a collision on the index slot becomes an [`Entry::Conflict`]
    /// - any other collision is a [`VfsError::HardConflict`]
    pub(crate) fn insert(&mut self, name: String, entry: Entry) -> Result<(), VfsError> {
        let mut slot = match self.entries.entry(name) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                return Ok(());
            }
            btree_map::Entry::Occupied(slot) => slot,
        };

        if slot.get().is_directory() && entry.is_directory() {
            return Ok(());
        }

        if slot.key() != INDEX_NAME {
            return Err(VfsError::HardConflict {
                uri: self.uri.clone(),
                name: slot.key().clone(),
            });
        }

        if let Entry::Conflict(conflict) = slot.get_mut() {
            conflict.push(entry);
            return Ok(());
        }
        let (name, first) = slot.remove_entry();
        self.entries
            .insert(name, Entry::Conflict(Conflict::new(first, entry)));
        Ok(())
    }
}

impl IntoIterator for Listing {
    type Item = (String, Entry);
    type IntoIter = btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
