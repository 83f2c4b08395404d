//! Identity allow-list bookkeeping.
//!
//! The list holds identities exempted from flood evaluation. An exemption is
//! suspended while the identity has an active custom ignore installed with
//! `ignore_exceptions`; that state lives on the identity's status, so the
//! caller supplies it as a predicate when asking whether an event is exempt.

use crate::domain::event::{FloodEvent, IdentityId};
use ahash::AHashSet;

/// Exception IDs.
#[derive(Debug, Clone, Default)]
pub struct ExceptionList {
    exceptions: AHashSet<IdentityId>,
}

impl ExceptionList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add identities to the exception list. Duplicates are ignored.
    pub fn add(&mut self, ids: impl IntoIterator<Item = IdentityId>) {
        self.exceptions.extend(ids);
    }

    /// Replace the exception list.
    pub fn set(&mut self, ids: impl IntoIterator<Item = IdentityId>) {
        self.exceptions = ids.into_iter().collect();
    }

    /// Remove every exception ID.
    pub fn clear(&mut self) {
        self.exceptions.clear();
    }

    /// Whether `id` is in the exception list.
    pub fn contains(&self, id: IdentityId) -> bool {
        self.exceptions.contains(&id)
    }

    /// Number of exception IDs.
    pub fn len(&self) -> usize {
        self.exceptions.len()
    }

    /// Whether there are no exception IDs.
    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    /// Whether the event should bypass flood evaluation.
    ///
    /// The event is exempt when its sender or chat is listed and neither of
    /// them is reported by `ignored`. `ignored` is only consulted once a
    /// listed identity has been found.
    pub fn exempts<E, F>(&self, event: &E, mut ignored: F) -> bool
    where
        E: FloodEvent + ?Sized,
        F: FnMut(IdentityId) -> bool,
    {
        if self.exceptions.is_empty() {
            return false;
        }

        let ids = [event.sender_id(), event.chat_id()];
        let excepted = ids.iter().flatten().any(|id| self.exceptions.contains(id));
        if !excepted {
            return false;
        }

        !ids.into_iter().flatten().any(|id| ignored(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Update;

    fn none(_: IdentityId) -> bool {
        false
    }

    #[test]
    fn test_add_deduplicates() {
        let mut list = ExceptionList::new();
        list.add([1, 2, 2, 3]);
        list.add([3]);
        assert_eq!(list.len(), 3);
        assert!(list.contains(2));
    }

    #[test]
    fn test_set_replaces() {
        let mut list = ExceptionList::new();
        list.add([1, 2]);
        list.set(vec![5]);
        assert!(!list.contains(1));
        assert!(list.contains(5));
    }

    #[test]
    fn test_clear() {
        let mut list = ExceptionList::new();
        list.add([1]);
        list.clear();
        assert!(list.is_empty());
        assert!(!list.exempts(&Update::message(-1, 1), none));
    }

    #[test]
    fn test_exempts_sender_or_chat() {
        let mut list = ExceptionList::new();
        list.add([10, -500]);

        assert!(list.exempts(&Update::message(-1, 10), none));
        assert!(list.exempts(&Update::message(-500, 77), none));
        assert!(list.exempts(&Update::channel_post(-500), none));
        assert!(!list.exempts(&Update::message(-1, 77), none));
    }

    #[test]
    fn test_ignored_overrides_exemption() {
        let mut list = ExceptionList::new();
        list.add([10]);
        assert!(!list.exempts(&Update::message(-1, 10), |id| id == 10));
        assert!(list.exempts(&Update::message(-1, 10), |id| id == 11));
    }

    #[test]
    fn test_ignored_chat_overrides_excepted_sender() {
        let mut list = ExceptionList::new();
        list.add([10]);
        assert!(!list.exempts(&Update::message(-1, 10), |id| id == -1));
    }

    #[test]
    fn test_ignored_not_consulted_without_listed_identity() {
        let mut list = ExceptionList::new();
        list.add([10]);

        let mut calls = 0;
        assert!(!list.exempts(&Update::message(-1, 77), |_| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_callback_query_resolution() {
        let mut list = ExceptionList::new();
        list.add([-42]);
        assert!(list.exempts(&Update::callback_query(5, Some(-42)), none));
        assert!(!list.exempts(&Update::callback_query(5, None), none));
    }
}
