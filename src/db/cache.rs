use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use moka::future::Cache;
use uuid::Uuid;

use crate::{error::AppResult, models::CachedRecommendations};

/// Per-actor store of ranked lists.
///
/// `invalidate` leaves a watermark behind: a list generated before the latest
/// watermark is neither served nor stored, so a ranking pass that started
/// before an interaction can never be served after it.
#[async_trait::async_trait]
pub trait RecommendationCache: Send + Sync {
    async fn get(&self, actor_id: Uuid) -> AppResult<Option<CachedRecommendations>>;

    async fn put(&self, actor_id: Uuid, list: CachedRecommendations) -> AppResult<()>;

    async fn invalidate(&self, actor_id: Uuid) -> AppResult<()>;
}

/// Size-bounded in-process cache with a time-to-live
#[derive(Clone)]
pub struct InMemoryRecommendationCache {
    entries: Cache<Uuid, Arc<CachedRecommendations>>,
    watermarks: Cache<Uuid, DateTime<Utc>>,
}

impl InMemoryRecommendationCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            watermarks: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    async fn is_stale(&self, actor_id: Uuid, generated_at: DateTime<Utc>) -> bool {
        self.watermarks
            .get(&actor_id)
            .await
            .is_some_and(|mark| generated_at < mark)
    }
}

#[async_trait::async_trait]
impl RecommendationCache for InMemoryRecommendationCache {
    async fn get(&self, actor_id: Uuid) -> AppResult<Option<CachedRecommendations>> {
        let Some(entry) = self.entries.get(&actor_id).await else {
            return Ok(None);
        };

        if self.is_stale(actor_id, entry.generated_at).await {
            self.entries.invalidate(&actor_id).await;
            return Ok(None);
        }

        Ok(Some(entry.as_ref().clone()))
    }

    async fn put(&self, actor_id: Uuid, list: CachedRecommendations) -> AppResult<()> {
        if self.is_stale(actor_id, list.generated_at).await {
            tracing::debug!(
                actor_id = %actor_id,
                "Discarding ranking generated before invalidation"
            );
            return Ok(());
        }

        self.entries.insert(actor_id, Arc::new(list)).await;
        Ok(())
    }

    async fn invalidate(&self, actor_id: Uuid) -> AppResult<()> {
        self.watermarks.insert(actor_id, Utc::now()).await;
        self.entries.invalidate(&actor_id).await;
        Ok(())
    }
}
