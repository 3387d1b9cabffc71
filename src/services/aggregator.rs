use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BusinessContext, InteractionEvent, InteractionKind, InterestKey, InterestScore,
        ScoreBreakdown,
    },
    services::{collaborators::ScoreStore, ledger::InteractionLedger},
};

const POINTS_PER_VIEW: f64 = 10.0;
const MAX_VIEW_SCORE: f64 = 100.0;
const MAX_ENGAGEMENT_SCORE: f64 = 200.0;
/// Every 30 seconds of dwell time is worth 10 points, up to 60
const SECONDS_PER_TIME_STEP: f64 = 30.0;
const POINTS_PER_TIME_STEP: f64 = 10.0;
const MAX_DURATION_SCORE: f64 = 60.0;
const MAX_SCROLL_SCORE: f64 = 40.0;

/// Engagement contribution of a single event
fn engagement_delta(event: &InteractionEvent) -> f64 {
    match event.kind {
        InteractionKind::Scrap => 50.0,
        InteractionKind::Unscrap => -25.0,
        InteractionKind::Rating => 10.0 * f64::from(event.metadata.rating.unwrap_or(0)),
        InteractionKind::Comment => 30.0,
        InteractionKind::Click => 40.0,
        InteractionKind::View | InteractionKind::Scroll => 0.0,
    }
}

/// Derives the sub-scores from a complete interaction history.
///
/// Pure and independent of event order. Engagement is capped above but not
/// below: repeated scrap/unscrap cycles can push it negative.
pub fn compute_breakdown(events: &[InteractionEvent]) -> ScoreBreakdown {
    let views = events
        .iter()
        .filter(|e| e.kind == InteractionKind::View)
        .count();
    let view_score = (views as f64 * POINTS_PER_VIEW).min(MAX_VIEW_SCORE);

    let engagement_score = events
        .iter()
        .map(engagement_delta)
        .sum::<f64>()
        .min(MAX_ENGAGEMENT_SCORE);

    let total_duration: f64 = events
        .iter()
        .filter_map(|e| e.metadata.duration_seconds)
        .map(f64::from)
        .sum();
    let max_scroll_depth = events
        .iter()
        .filter_map(|e| e.metadata.scroll_depth)
        .max()
        .unwrap_or(0);
    let time_score = (total_duration / SECONDS_PER_TIME_STEP * POINTS_PER_TIME_STEP)
        .min(MAX_DURATION_SCORE)
        + f64::from(max_scroll_depth) / 100.0 * MAX_SCROLL_SCORE;

    ScoreBreakdown {
        view_score,
        engagement_score,
        time_score,
    }
}

/// Recomputes stored interest scores from the interaction ledger
#[derive(Clone)]
pub struct ScoreAggregator {
    ledger: Arc<dyn InteractionLedger>,
    scores: Arc<dyn ScoreStore>,
}

impl ScoreAggregator {
    pub fn new(ledger: Arc<dyn InteractionLedger>, scores: Arc<dyn ScoreStore>) -> Self {
        Self { ledger, scores }
    }

    /// Rebuilds the score for one (actor, item) pair from its full history and
    /// overwrites the stored row.
    ///
    /// Every call starts from the ledger, never from the previous score, so
    /// concurrent calls for the same key cannot compound each other.
    pub async fn recompute(
        &self,
        actor_id: Uuid,
        item_id: Uuid,
        context: &BusinessContext,
    ) -> AppResult<InterestScore> {
        let events = self.ledger.events_for(actor_id, item_id).await?;
        let breakdown = compute_breakdown(&events);

        let key = InterestKey::new(actor_id, context.id, item_id);
        let score = InterestScore::new(key, breakdown, Utc::now());
        self.scores.upsert_interest(score.clone()).await?;

        tracing::debug!(
            actor_id = %actor_id,
            item_id = %item_id,
            event_count = events.len(),
            total_score = score.total_score(),
            "Interest score recomputed"
        );

        Ok(score)
    }
}
