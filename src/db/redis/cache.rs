use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::cache::RecommendationCache;
use crate::error::AppError;
use crate::error::AppResult;
use crate::models::CachedRecommendations;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Ranked list of an actor
    Recommendations(Uuid),
    /// Latest invalidation time of an actor, in epoch milliseconds
    Invalidation(Uuid),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(actor_id) => write!(f, "rec:list:{}", actor_id),
            CacheKey::Invalidation(actor_id) => write!(f, "rec:inv:{}", actor_id),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed recommendation cache
#[derive(Clone)]
pub struct RedisRecommendationCache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
    ttl: u64,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl RedisRecommendationCache {
    /// Creates the cache and spawns its background writer.
    ///
    /// Writes go through a channel so storing a ranking never delays the
    /// response that produced it.
    pub fn new(redis_client: Client, ttl: u64) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
            ttl,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// Drains write messages until shutdown, then flushes what is left
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");
                    write_rx.close();

                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(
                                error = %e,
                                "Failed to flush cache write during shutdown"
                            );
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Queues a write without waiting for it
    fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl: self.ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

/// Whether a list generated at `generated_at_ms` predates the watermark
fn predates(generated_at_ms: i64, watermark: Option<&str>) -> bool {
    watermark
        .and_then(|mark| mark.parse::<i64>().ok())
        .is_some_and(|mark| generated_at_ms < mark)
}

#[async_trait::async_trait]
impl RecommendationCache for RedisRecommendationCache {
    async fn get(&self, actor_id: Uuid) -> AppResult<Option<CachedRecommendations>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let keys = [
            CacheKey::Recommendations(actor_id).to_string(),
            CacheKey::Invalidation(actor_id).to_string(),
        ];
        let values: Vec<Option<String>> = conn.mget(&keys[..]).await?;

        let (Some(Some(json)), watermark) = (values.first(), values.get(1).cloned().flatten())
        else {
            return Ok(None);
        };

        let list: CachedRecommendations = serde_json::from_str(json).map_err(|e| {
            AppError::Internal(format!("Cache deserialization error: {}", e))
        })?;

        if predates(list.generated_at.timestamp_millis(), watermark.as_deref()) {
            return Ok(None);
        }

        Ok(Some(list))
    }

    async fn put(&self, actor_id: Uuid, list: CachedRecommendations) -> AppResult<()> {
        self.set_in_background(&CacheKey::Recommendations(actor_id), &list);
        Ok(())
    }

    async fn invalidate(&self, actor_id: Uuid) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let now_ms = chrono::Utc::now().timestamp_millis();

        let _: () = redis::pipe()
            .atomic()
            .del(CacheKey::Recommendations(actor_id).to_string())
            .ignore()
            .set_ex(CacheKey::Invalidation(actor_id).to_string(), now_ms, self.ttl)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Provenance, Recommendation};
    use chrono::Utc;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    fn list() -> CachedRecommendations {
        CachedRecommendations {
            generated_at: Utc::now(),
            items: vec![Recommendation {
                item_id: Uuid::new_v4(),
                category: Category::Grant,
                priority_score: None,
                provenance: Provenance::Filled,
            }],
        }
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        let id = Uuid::nil();
        let key = CacheKey::Recommendations(id);
        assert_eq!(key.to_string(), format!("rec:list:{}", id));
    }

    #[test]
    fn test_cache_key_display_invalidation() {
        let id = Uuid::nil();
        let key = CacheKey::Invalidation(id);
        assert_eq!(key.to_string(), format!("rec:inv:{}", id));
    }

    #[test]
    fn test_predates_watermark() {
        assert!(predates(1_000, Some("2000")));
        assert!(!predates(2_000, Some("2000")));
        assert!(!predates(1_000, None));
        assert!(!predates(1_000, Some("garbage")));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_put_in_background_then_get() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = RedisRecommendationCache::new(client, 60);
        let actor = Uuid::new_v4();
        let value = list();

        cache.put(actor, value.clone()).await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        assert_eq!(cache.get(actor).await.unwrap(), Some(value));
        cache.invalidate(actor).await.unwrap();
        assert_eq!(cache.get(actor).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_late_write_after_invalidation_is_not_served() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = RedisRecommendationCache::new(client, 60);
        let actor = Uuid::new_v4();

        let mut stale = list();
        stale.generated_at = Utc::now() - chrono::Duration::seconds(5);
        cache.invalidate(actor).await.unwrap();
        cache.put(actor, stale).await.unwrap();
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        assert_eq!(cache.get(actor).await.unwrap(), None);
    }
}
