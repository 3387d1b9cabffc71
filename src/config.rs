use serde::Deserialize;

use crate::models::Category;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; in-memory stores are used when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; an in-process cache is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Size of the recent candidate set loaded per ranking request
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Number of entries in a ranked recommendation list
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Lifetime of a cached ranking, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of actors kept in the in-process cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Pending recompute jobs accepted before new ones are dropped
    #[serde(default = "default_rescore_queue_capacity")]
    pub rescore_queue_capacity: usize,

    /// Background recompute workers
    #[serde(default = "default_rescore_workers")]
    pub rescore_workers: usize,

    /// Comma-separated categories the fallback fill draws from
    #[serde(default = "default_fallback_categories")]
    pub fallback_categories: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_candidate_limit() -> usize {
    100
}

fn default_recommendation_limit() -> usize {
    20
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_rescore_queue_capacity() -> usize {
    1024
}

fn default_rescore_workers() -> usize {
    4
}

fn default_fallback_categories() -> String {
    "loan,grant,guarantee,education".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            host: default_host(),
            port: default_port(),
            candidate_limit: default_candidate_limit(),
            recommendation_limit: default_recommendation_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            rescore_queue_capacity: default_rescore_queue_capacity(),
            rescore_workers: default_rescore_workers(),
            fallback_categories: default_fallback_categories(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Parses the fallback category list, skipping unknown names
    pub fn fallback_categories(&self) -> Vec<Category> {
        self.fallback_categories
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .filter_map(|name| match name.parse::<Category>() {
                Ok(category) => Some(category),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unknown fallback category");
                    None
                }
            })
            .collect()
    }
}
