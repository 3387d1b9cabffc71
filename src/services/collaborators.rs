//! Narrow interfaces to the systems this crate reads from and writes to.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Actor, CatalogItem, Category, InterestKey, InterestScore},
};

/// Resolves actors and their current business context
#[async_trait::async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn resolve_actor(&self, actor_id: Uuid) -> AppResult<Option<Actor>>;
}

/// Read access to the offer catalog
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Most recent items first, optionally restricted to one category
    async fn load_candidate_items(
        &self,
        limit: usize,
        category: Option<Category>,
    ) -> AppResult<Vec<CatalogItem>>;

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<CatalogItem>>;
}

/// Persistence for aggregated interest scores
#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get_interest(&self, key: &InterestKey) -> AppResult<Option<InterestScore>>;

    /// Inserts or overwrites the row for the score's key
    async fn upsert_interest(&self, score: InterestScore) -> AppResult<()>;
}
