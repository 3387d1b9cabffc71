use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::cache::RecommendationCache,
    error::{AppError, AppResult},
    models::{
        Actor, CachedRecommendations, InteractionEvent, InteractionKind, InteractionMetadata,
        Recommendation,
    },
    services::{
        collaborators::{ActorDirectory, CatalogSource},
        dispatcher::{RescoreDispatcher, RescoreJob, ScheduleRejection},
        ledger::InteractionLedger,
        ranking::PriorityRankingEngine,
    },
};

/// An interaction as reported by a caller
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionInput {
    pub item_id: Uuid,
    pub kind: InteractionKind,
    #[serde(flatten)]
    pub metadata: InteractionMetadata,
}

/// Sizes used by the ranking path
#[derive(Debug, Clone, Copy)]
pub struct RankingSettings {
    /// How many recent catalog items are considered per request
    pub candidate_limit: usize,
    /// How many entries a ranked list holds
    pub recommendation_limit: usize,
}

/// The collaborators the service reads from and writes to
#[derive(Clone)]
pub struct Collaborators {
    pub actors: Arc<dyn ActorDirectory>,
    pub catalog: Arc<dyn CatalogSource>,
    pub ledger: Arc<dyn InteractionLedger>,
}

/// Entry point for ranking requests and interaction recording
pub struct RecommendationService {
    collaborators: Collaborators,
    engine: PriorityRankingEngine,
    cache: Arc<dyn RecommendationCache>,
    dispatcher: RescoreDispatcher,
    settings: RankingSettings,
}

impl RecommendationService {
    pub fn new(
        collaborators: Collaborators,
        engine: PriorityRankingEngine,
        cache: Arc<dyn RecommendationCache>,
        dispatcher: RescoreDispatcher,
        settings: RankingSettings,
    ) -> Self {
        Self {
            collaborators,
            engine,
            cache,
            dispatcher,
            settings,
        }
    }

    async fn resolve_actor(&self, actor_id: Uuid) -> AppResult<Actor> {
        self.collaborators
            .actors
            .resolve_actor(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("actor {}", actor_id)))
    }

    /// Returns the actor's ranked list, from cache when a fresh one exists.
    ///
    /// Falls back to the most recent catalog items when nothing could be
    /// ranked, so the list is only empty when the catalog is.
    pub async fn get_ranked_recommendations(
        &self,
        actor_id: Uuid,
    ) -> AppResult<Vec<Recommendation>> {
        let actor = self.resolve_actor(actor_id).await?;

        match self.cache.get(actor_id).await {
            Ok(Some(cached)) => {
                tracing::debug!(actor_id = %actor_id, count = cached.items.len(), "Cache hit");
                return Ok(cached.items);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    actor_id = %actor_id,
                    error = %e,
                    "Cache read failed, ranking afresh"
                );
            }
        }

        let generated_at = Utc::now();
        let limit = self.settings.recommendation_limit;
        let candidates = self
            .collaborators
            .catalog
            .load_candidate_items(self.settings.candidate_limit, None)
            .await?;
        let candidate_count = candidates.len();

        let mut items = self
            .engine
            .generate(&actor, &actor.business_context, candidates, limit)
            .await;

        if items.is_empty() {
            items = self.global_fallback(limit).await?;
        }

        tracing::info!(
            actor_id = %actor_id,
            candidates = candidate_count,
            returned = items.len(),
            "Recommendations generated"
        );

        let list = CachedRecommendations {
            generated_at,
            items,
        };
        if let Err(e) = self.cache.put(actor_id, list.clone()).await {
            tracing::warn!(actor_id = %actor_id, error = %e, "Cache write failed");
        }

        Ok(list.items)
    }

    /// Most recent catalog items, unpersonalized
    async fn global_fallback(&self, limit: usize) -> AppResult<Vec<Recommendation>> {
        let items = self
            .collaborators
            .catalog
            .load_candidate_items(limit, None)
            .await?;
        Ok(items.iter().map(Recommendation::filled).collect())
    }

    /// Records one interaction, invalidates the actor's cached ranking and
    /// schedules a background recompute of the pair's interest score.
    ///
    /// Returns once the event is stored; the recompute may still be running.
    pub async fn record_interaction(
        &self,
        actor_id: Uuid,
        input: InteractionInput,
    ) -> AppResult<()> {
        input
            .metadata
            .validate(input.kind)
            .map_err(AppError::InvalidInput)?;

        let actor = self.resolve_actor(actor_id).await?;
        if self
            .collaborators
            .catalog
            .find_item(input.item_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("item {}", input.item_id)));
        }

        let event = InteractionEvent::new(actor_id, input.item_id, input.kind, input.metadata);
        self.collaborators.ledger.append(event).await?;

        // The event is already stored, so a cache fault is logged rather than
        // reported back to the caller
        if let Err(e) = self.cache.invalidate(actor_id).await {
            tracing::error!(actor_id = %actor_id, error = %e, "Cache invalidation failed");
        }

        // A rejected job is already logged by the dispatcher; the stored event
        // is picked up by the next recompute of this pair
        let rescore = match self.dispatcher.schedule(RescoreJob {
            actor_id,
            item_id: input.item_id,
            context: actor.business_context,
        }) {
            Ok(()) => "scheduled",
            Err(ScheduleRejection::QueueFull) => "dropped_queue_full",
            Err(ScheduleRejection::ShutDown) => "dropped_shut_down",
        };

        tracing::info!(
            actor_id = %actor_id,
            item_id = %input.item_id,
            kind = %input.kind,
            rescore,
            "Interaction recorded"
        );

        Ok(())
    }
}
