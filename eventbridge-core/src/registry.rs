//! Listener registry.
//!
//! Maps event names to insertion-ordered lists of [`CallbackRecord`]s. A key
//! exists only while at least one listener is registered for it.
//!
//! Emission works on a snapshot: [`ListenerRegistry::snapshot`] clones the
//! list of `Arc`s under the read lock and releases it, so listeners can
//! register or remove listeners while an emission is in flight.

use crate::callback::{CallbackRecord, ListenerHandle};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Event name to ordered listeners.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    lists: RwLock<HashMap<String, Vec<Arc<CallbackRecord>>>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the list for `event`.
    pub fn add(&self, event: &str, record: CallbackRecord) -> ListenerHandle {
        let handle = record.handle();
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        lists
            .entry(event.to_owned())
            .or_default()
            .push(Arc::new(record));
        handle
    }

    /// Remove the record registered under `handle`.
    ///
    /// Returns whether a record was removed.
    pub fn remove(&self, event: &str, handle: ListenerHandle) -> bool {
        self.remove_first(event, |record| record.handle() == handle)
    }

    /// Remove the first record matching `predicate`.
    pub fn remove_first<P>(&self, event: &str, predicate: P) -> bool
    where
        P: Fn(&CallbackRecord) -> bool,
    {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = lists.get_mut(event) else {
            return false;
        };
        let Some(pos) = list.iter().position(|record| predicate(record)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            lists.remove(event);
        }
        true
    }

    /// Drop every record for `event`, returning how many there were.
    pub fn clear(&self, event: &str) -> usize {
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        lists.remove(event).map_or(0, |list| list.len())
    }

    /// The records for `event`, in registration order.
    pub fn snapshot(&self, event: &str) -> Option<Vec<Arc<CallbackRecord>>> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        lists.get(event).cloned()
    }

    /// Number of records for `event`.
    pub fn len(&self, event: &str) -> usize {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        lists.get(event).map_or(0, Vec::len)
    }

    /// Whether no listeners are registered at all.
    pub fn is_empty(&self) -> bool {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        lists.is_empty()
    }

    /// Events with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let lists = self.lists.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = lists.keys().cloned().collect();
        names.sort();
        names
    }
}
