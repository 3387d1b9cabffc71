use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Actor, BusinessContext, CatalogItem, Category, InterestKey, RankedCandidate,
        Recommendation,
    },
    services::{
        age::AgeAffinityEvaluator,
        collaborators::{CatalogSource, ScoreStore},
        region::RegionAffinityEvaluator,
    },
};

const INTEREST_WEIGHT: f64 = 0.4;
const REGION_WEIGHT: f64 = 0.3;
const AGE_WEIGHT: f64 = 0.2;
const RECENCY_WEIGHT: f64 = 0.1;

const MAX_RECENCY_SCORE: f64 = 100.0;
const MIN_RECENCY_SCORE: f64 = 10.0;

/// Freshness of an item: 100 on its first day, one point less per day, never below 10
pub fn recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days() as f64;
    (MAX_RECENCY_SCORE - days)
        .max(MIN_RECENCY_SCORE)
        .min(MAX_RECENCY_SCORE)
}

/// Weighted composite of the four component scores
pub fn priority_score(interest: f64, region: f64, age: f64, recency: f64) -> f64 {
    INTEREST_WEIGHT * interest
        + REGION_WEIGHT * region
        + AGE_WEIGHT * age
        + RECENCY_WEIGHT * recency
}

/// Newest first, then by id so equal timestamps still order deterministically
fn by_recency(a: &CatalogItem, b: &CatalogItem) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Combines interest, region, age and recency into one ordered list
#[derive(Clone)]
pub struct PriorityRankingEngine {
    scores: Arc<dyn ScoreStore>,
    catalog: Arc<dyn CatalogSource>,
    region: RegionAffinityEvaluator,
    age: AgeAffinityEvaluator,
    fallback_categories: Vec<Category>,
}

impl PriorityRankingEngine {
    pub fn new(
        scores: Arc<dyn ScoreStore>,
        catalog: Arc<dyn CatalogSource>,
        fallback_categories: Vec<Category>,
    ) -> Self {
        Self {
            scores,
            catalog,
            region: RegionAffinityEvaluator::new(),
            age: AgeAffinityEvaluator::new(),
            fallback_categories,
        }
    }

    /// Ranks the candidates and truncates to `limit`, appending fallback items
    /// when fewer than `limit` could be ranked.
    ///
    /// An empty candidate set yields an empty list; escalating to a global
    /// fallback is left to the caller.
    pub async fn generate(
        &self,
        actor: &Actor,
        context: &BusinessContext,
        candidates: Vec<CatalogItem>,
        limit: usize,
    ) -> Vec<Recommendation> {
        if candidates.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut ranked = self
            .score_candidates(actor, context, candidates, Utc::now())
            .await;
        ranked.truncate(limit);

        let mut recommendations: Vec<Recommendation> =
            ranked.iter().map(Recommendation::ranked).collect();

        let missing = limit - recommendations.len();
        if missing > 0 {
            let selected: HashSet<Uuid> = ranked.iter().map(|c| c.item.id).collect();
            match self.fallback_fill(&selected, missing).await {
                Ok(filled) => {
                    tracing::debug!(
                        actor_id = %actor.id,
                        ranked = recommendations.len(),
                        filled = filled.len(),
                        "Appending fallback items"
                    );
                    recommendations.extend(filled.iter().map(Recommendation::filled));
                }
                Err(e) => {
                    tracing::warn!(actor_id = %actor.id, error = %e, "Fallback fill failed");
                }
            }
        }

        recommendations
    }

    /// Scores every candidate and sorts by priority, most recent first on ties.
    ///
    /// A candidate that fails to score is skipped; the rest are still ranked.
    pub async fn score_candidates(
        &self,
        actor: &Actor,
        context: &BusinessContext,
        candidates: Vec<CatalogItem>,
        now: DateTime<Utc>,
    ) -> Vec<RankedCandidate> {
        let mut seen = HashSet::new();
        let mut ranked = Vec::with_capacity(candidates.len());

        for item in candidates {
            if !seen.insert(item.id) {
                continue;
            }

            match self.score_candidate(actor, context, item, now).await {
                Ok(candidate) => ranked.push(candidate),
                Err(e) => {
                    tracing::warn!(
                        actor_id = %actor.id,
                        error = %e,
                        "Skipping candidate that failed to score"
                    );
                }
            }
        }

        ranked.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| by_recency(&a.item, &b.item))
        });

        ranked
    }

    async fn score_candidate(
        &self,
        actor: &Actor,
        context: &BusinessContext,
        item: CatalogItem,
        now: DateTime<Utc>,
    ) -> AppResult<RankedCandidate> {
        let key = InterestKey::new(actor.id, context.id, item.id);
        let interest_score = self
            .scores
            .get_interest(&key)
            .await?
            .map(|score| score.total_score())
            .unwrap_or(0.0);

        let region_score = self.region.score(context, &item);
        let age_score = self
            .age
            .score(actor, &item.age_condition, now.date_naive());
        let recency_score = recency_score(item.created_at, now);
        let priority = priority_score(interest_score, region_score, age_score, recency_score);

        if !priority.is_finite() {
            return Err(AppError::Scoring(format!(
                "non-finite priority for item {}",
                item.id
            )));
        }

        Ok(RankedCandidate {
            item,
            interest_score,
            region_score,
            age_score,
            recency_score,
            priority_score: priority,
        })
    }

    /// Most recent items drawn evenly across the fallback categories, skipping
    /// `exclude`, newest first. Tops up from the whole catalog when the
    /// categories run dry.
    pub async fn fallback_fill(
        &self,
        exclude: &HashSet<Uuid>,
        needed: usize,
    ) -> AppResult<Vec<CatalogItem>> {
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut taken: HashSet<Uuid> = HashSet::new();
        let mut pool: Vec<CatalogItem> = Vec::new();

        if !self.fallback_categories.is_empty() {
            let per_category = needed.div_ceil(self.fallback_categories.len());

            for category in &self.fallback_categories {
                let items = self
                    .catalog
                    .load_candidate_items(per_category + exclude.len(), Some(*category))
                    .await?;

                let fresh: Vec<CatalogItem> = items
                    .into_iter()
                    .filter(|item| !exclude.contains(&item.id) && !taken.contains(&item.id))
                    .take(per_category)
                    .collect();
                taken.extend(fresh.iter().map(|item| item.id));
                pool.extend(fresh);
            }
        }

        if pool.len() < needed {
            let items = self
                .catalog
                .load_candidate_items(needed + exclude.len() + pool.len(), None)
                .await?;

            for item in items {
                if pool.len() >= needed {
                    break;
                }
                if !exclude.contains(&item.id) && taken.insert(item.id) {
                    pool.push(item);
                }
            }
        }

        pool.sort_by(by_recency);
        pool.truncate(needed);
        Ok(pool)
    }
}
