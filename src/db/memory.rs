use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Actor, CatalogItem, Category, InteractionEvent, InterestKey, InterestScore},
    services::{
        collaborators::{ActorDirectory, CatalogSource, ScoreStore},
        ledger::{InteractionLedger, RetentionPolicy},
    },
};

/// In-process store backing every collaborator interface.
///
/// Used when no database is configured and throughout the tests.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<Uuid, CatalogItem>>,
    actors: RwLock<HashMap<Uuid, Actor>>,
    events: RwLock<HashMap<(Uuid, Uuid), Vec<InteractionEvent>>>,
    scores: RwLock<HashMap<InterestKey, InterestScore>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_item(&self, item: CatalogItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn insert_actor(&self, actor: Actor) {
        self.actors.write().await.insert(actor.id, actor);
    }

    /// Number of stored interest scores
    pub async fn score_count(&self) -> usize {
        self.scores.read().await.len()
    }
}

#[async_trait::async_trait]
impl InteractionLedger for MemoryStore {
    async fn append(&self, event: InteractionEvent) -> AppResult<()> {
        self.events
            .write()
            .await
            .entry((event.actor_id, event.item_id))
            .or_default()
            .push(event);
        Ok(())
    }

    async fn events_for(&self, actor_id: Uuid, item_id: Uuid) -> AppResult<Vec<InteractionEvent>> {
        Ok(self
            .events
            .read()
            .await
            .get(&(actor_id, item_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn compact(
        &self,
        actor_id: Uuid,
        item_id: Uuid,
        policy: RetentionPolicy,
    ) -> AppResult<usize> {
        let mut events = self.events.write().await;
        let Some(history) = events.get_mut(&(actor_id, item_id)) else {
            return Ok(0);
        };

        let expired = policy.expired(history);
        history.retain(|event| !expired.contains(&event.id));
        Ok(expired.len())
    }
}

#[async_trait::async_trait]
impl ScoreStore for MemoryStore {
    async fn get_interest(&self, key: &InterestKey) -> AppResult<Option<InterestScore>> {
        Ok(self.scores.read().await.get(key).cloned())
    }

    async fn upsert_interest(&self, score: InterestScore) -> AppResult<()> {
        self.scores.write().await.insert(*score.key(), score);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogSource for MemoryStore {
    async fn load_candidate_items(
        &self,
        limit: usize,
        category: Option<Category>,
    ) -> AppResult<Vec<CatalogItem>> {
        let items = self.items.read().await;
        let mut selected: Vec<CatalogItem> = items
            .values()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .cloned()
            .collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        selected.truncate(limit);
        Ok(selected)
    }

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<CatalogItem>> {
        Ok(self.items.read().await.get(&item_id).cloned())
    }
}

#[async_trait::async_trait]
impl ActorDirectory for MemoryStore {
    async fn resolve_actor(&self, actor_id: Uuid) -> AppResult<Option<Actor>> {
        Ok(self.actors.read().await.get(&actor_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InteractionKind, InteractionMetadata};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_events_are_scoped_to_pair() {
        let store = MemoryStore::new();
        let (actor, item, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        for item_id in [item, item, other] {
            store
                .append(InteractionEvent::new(
                    actor,
                    item_id,
                    InteractionKind::View,
                    InteractionMetadata::default(),
                ))
                .await
                .unwrap();
        }

        assert_eq!(store.events_for(actor, item).await.unwrap().len(), 2);
        assert_eq!(store.events_for(actor, other).await.unwrap().len(), 1);
        assert!(store.events_for(other, item).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compact_keeps_latest() {
        let store = MemoryStore::new();
        let (actor, item) = (Uuid::new_v4(), Uuid::new_v4());

        for minutes_ago in [30, 20, 10] {
            let mut event = InteractionEvent::new(
                actor,
                item,
                InteractionKind::Click,
                InteractionMetadata::default(),
            );
            event.created_at = Utc::now() - Duration::minutes(minutes_ago);
            store.append(event).await.unwrap();
        }

        let removed = store
            .compact(actor, item, RetentionPolicy::KeepLatest(1))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.events_for(actor, item).await.unwrap().len(), 1);

        let untouched = store
            .compact(Uuid::new_v4(), item, RetentionPolicy::KeepLatest(1))
            .await
            .unwrap();
        assert_eq!(untouched, 0);
    }

    #[tokio::test]
    async fn test_candidates_most_recent_first_with_category_filter() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old_loan = CatalogItem::new(Category::Loan, "old loan", now - Duration::days(3));
        let new_loan = CatalogItem::new(Category::Loan, "new loan", now - Duration::days(1));
        let grant = CatalogItem::new(Category::Grant, "grant", now);

        for item in [old_loan.clone(), new_loan.clone(), grant.clone()] {
            store.insert_item(item).await;
        }

        let all = store.load_candidate_items(10, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![grant.id, new_loan.id, old_loan.id]);

        let loans = store
            .load_candidate_items(1, Some(Category::Loan))
            .await
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].id, new_loan.id);
    }
}
