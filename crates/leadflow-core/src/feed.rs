//! Folding realtime change events into an in-memory list.
//!
//! The backend publishes insert/update/delete events per row. Consumers keep
//! a [`LiveCollection`] and apply each event as it arrives: inserts go to the
//! front (newest first, matching the `created_at DESC` load order), updates
//! replace in place, deletes remove. Events for unknown ids are ignored on
//! update and delete.

use std::hash::Hash;

use crate::contact::Contact;
use crate::unresolved::UnresolvedLead;

/// A row-level change, resolved to the current row for inserts and updates.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T: Keyed> {
    Insert(T),
    Update(T),
    Delete(T::Key),
}

/// Entities identified by a stable key.
pub trait Keyed {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

impl Keyed for Contact {
    type Key = uuid::Uuid;

    fn key(&self) -> Self::Key {
        self.id
    }
}

impl Keyed for UnresolvedLead {
    type Key = i64;

    fn key(&self) -> Self::Key {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    items: Vec<T>,
}

impl<T> Default for LiveCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> LiveCollection<T> {
    /// Seeds the collection from an initial load, keeping its order.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn apply(&mut self, event: ChangeEvent<T>) {
        match event {
            ChangeEvent::Insert(new) => {
                let key = new.key();
                self.items.retain(|item| item.key() != key);
                self.items.insert(0, new);
            }
            ChangeEvent::Update(new) => {
                let key = new.key();
                if let Some(slot) = self.items.iter_mut().find(|item| item.key() == key) {
                    *slot = new;
                }
            }
            ChangeEvent::Delete(key) => {
                self.items.retain(|item| item.key() != key);
            }
        }
    }

    /// Removes an item locally, e.g. after a confirmed delete.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let idx = self.items.iter().position(|item| &item.key() == key)?;
        Some(self.items.remove(idx))
    }

    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|item| &item.key() == key)
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
