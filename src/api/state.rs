use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    db::{
        cache::{InMemoryRecommendationCache, RecommendationCache},
        memory::MemoryStore,
        postgres::{create_pool, run_migrations, PgStore},
        redis::{create_redis_client, CacheWriterHandle, RedisRecommendationCache},
    },
    services::{
        collaborators::{ActorDirectory, CatalogSource, ScoreStore},
        ledger::InteractionLedger,
        Collaborators, PriorityRankingEngine, RankingSettings, RecommendationService,
        RescoreDispatcher, RescoreWorkersHandle, ScoreAggregator,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
}

/// Background tasks that must be drained before the process exits
pub struct BackgroundTasks {
    rescore: RescoreWorkersHandle,
    cache_writer: Option<CacheWriterHandle>,
}

impl BackgroundTasks {
    /// Runs queued recomputes, then flushes pending cache writes
    pub async fn shutdown(self) {
        self.rescore.shutdown().await;
        if let Some(writer) = self.cache_writer {
            writer.shutdown().await;
        }
    }
}

/// A store that serves every collaborator interface
trait Store: ActorDirectory + CatalogSource + ScoreStore + InteractionLedger {}

impl<T: ActorDirectory + CatalogSource + ScoreStore + InteractionLedger> Store for T {}

impl AppState {
    /// Builds the state described by `config`.
    ///
    /// PostgreSQL backs the collaborators when `DATABASE_URL` is set and Redis
    /// backs the cache when `REDIS_URL` is set; otherwise in-process
    /// implementations are used.
    pub async fn from_config(config: &Config) -> anyhow::Result<(Self, BackgroundTasks)> {
        let (cache, cache_writer): (Arc<dyn RecommendationCache>, _) = match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (cache, writer) = RedisRecommendationCache::new(client, config.cache_ttl_secs);
                tracing::info!("Using Redis recommendation cache");
                (Arc::new(cache), Some(writer))
            }
            None => {
                tracing::info!("Using in-process recommendation cache");
                (Arc::new(in_process_cache(config)), None)
            }
        };

        let (state, rescore) = match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).await?;
                run_migrations(&pool).await?;
                tracing::info!("Using PostgreSQL store");
                Self::assemble(Arc::new(PgStore::new(pool)), cache, config)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Self::assemble(Arc::new(MemoryStore::new()), cache, config)
            }
        };

        Ok((
            state,
            BackgroundTasks {
                rescore,
                cache_writer,
            },
        ))
    }

    /// State over an existing in-memory store with an in-process cache
    pub fn in_memory(store: Arc<MemoryStore>, config: &Config) -> (Self, BackgroundTasks) {
        let cache = Arc::new(in_process_cache(config));
        let (state, rescore) = Self::assemble(store, cache, config);
        (
            state,
            BackgroundTasks {
                rescore,
                cache_writer: None,
            },
        )
    }

    fn assemble<S: Store + 'static>(
        store: Arc<S>,
        cache: Arc<dyn RecommendationCache>,
        config: &Config,
    ) -> (Self, RescoreWorkersHandle) {
        let aggregator = ScoreAggregator::new(store.clone(), store.clone());
        let (dispatcher, rescore) = RescoreDispatcher::start(
            aggregator,
            config.rescore_queue_capacity,
            config.rescore_workers,
        );

        let engine =
            PriorityRankingEngine::new(store.clone(), store.clone(), config.fallback_categories());

        let collaborators = Collaborators {
            actors: store.clone(),
            catalog: store.clone(),
            ledger: store,
        };

        let service = RecommendationService::new(
            collaborators,
            engine,
            cache,
            dispatcher,
            RankingSettings {
                candidate_limit: config.candidate_limit,
                recommendation_limit: config.recommendation_limit,
            },
        );

        (
            Self {
                recommendations: Arc::new(service),
            },
            rescore,
        )
    }
}

fn in_process_cache(config: &Config) -> InMemoryRecommendationCache {
    InMemoryRecommendationCache::new(
        config.cache_capacity,
        Duration::from_secs(config.cache_ttl_secs),
    )
}
