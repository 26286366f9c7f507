use std::collections::HashMap;

use shared::domain::{Conversation, ConversationId};

/// The client's ordered list of known conversations, unique by id,
/// most-recently-touched-first.
///
/// Records live in a map keyed by id; `recency` holds only ids, front
/// first, so a promote moves one id instead of rescanning full records.
#[derive(Debug, Default)]
pub struct ConversationCache {
    records: HashMap<ConversationId, Conversation>,
    recency: Vec<ConversationId>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single mutation entry point: insert at the front, or replace the
    /// existing entry for the same id and promote it to the front. The
    /// remove and reinsert happen as one step; callers never observe an
    /// intermediate state.
    pub fn upsert_front(&mut self, conversation: Conversation) {
        let id = conversation.id.clone();
        if self.records.insert(id.clone(), conversation).is_some() {
            if let Some(position) = self.recency.iter().position(|existing| *existing == id) {
                self.recency.remove(position);
            }
        }
        self.recency.insert(0, id);
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.records.get(id)
    }

    /// Read-only snapshot in recency order. Not kept in sync with later
    /// mutations.
    pub fn snapshot(&self) -> Vec<Conversation> {
        self.recency
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.recency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recency.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.recency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(id: &str, name: &str) -> Conversation {
        Conversation {
            id: id.into(),
            is_group: true,
            name: Some(name.to_string()),
            member_ids: vec!["u1".into(), "u2".into()],
            last_activity_hint: None,
        }
    }

    #[test]
    fn new_entries_land_at_the_front() {
        let mut cache = ConversationCache::new();
        cache.upsert_front(conversation("c1", "first"));
        cache.upsert_front(conversation("c2", "second"));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, "c2".into());
        assert_eq!(snapshot[1].id, "c1".into());
    }

    #[test]
    fn upserting_an_existing_id_replaces_and_promotes() {
        let mut cache = ConversationCache::new();
        cache.upsert_front(conversation("c1", "first"));
        cache.upsert_front(conversation("c2", "second"));
        cache.upsert_front(conversation("c1", "renamed"));

        assert_eq!(cache.len(), 2);
        let snapshot = cache.snapshot();
        assert_eq!(snapshot[0].id, "c1".into());
        assert_eq!(snapshot[0].name.as_deref(), Some("renamed"));
        assert_eq!(snapshot[1].id, "c2".into());
    }

    #[test]
    fn repeated_upserts_of_one_id_keep_a_single_entry() {
        let mut cache = ConversationCache::new();
        for _ in 0..5 {
            cache.upsert_front(conversation("c1", "only"));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"c1".into()));
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut cache = ConversationCache::new();
        cache.upsert_front(conversation("c1", "first"));
        let snapshot = cache.snapshot();

        cache.upsert_front(conversation("c2", "second"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.len(), 2);
    }
}
