pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use cache::{InMemoryRecommendationCache, RecommendationCache};
pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::{create_redis_client, RedisRecommendationCache};
