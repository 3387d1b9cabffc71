use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const VIEW_WEIGHT: f64 = 0.3;
const ENGAGEMENT_WEIGHT: f64 = 0.5;
const TIME_WEIGHT: f64 = 0.2;

/// Identifies one stored interest score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterestKey {
    pub actor_id: Uuid,
    pub business_context_id: Uuid,
    pub item_id: Uuid,
}

impl InterestKey {
    pub fn new(actor_id: Uuid, business_context_id: Uuid, item_id: Uuid) -> Self {
        Self {
            actor_id,
            business_context_id,
            item_id,
        }
    }
}

/// The three sub-scores derived from an interaction history
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub view_score: f64,
    pub engagement_score: f64,
    pub time_score: f64,
}

impl ScoreBreakdown {
    /// Weighted total of the sub-scores
    pub fn total(&self) -> f64 {
        VIEW_WEIGHT * self.view_score
            + ENGAGEMENT_WEIGHT * self.engagement_score
            + TIME_WEIGHT * self.time_score
    }
}

/// Persisted interest of an actor in one item.
///
/// The total is always derived from the stored sub-scores; there is no way to
/// set it on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestScore {
    key: InterestKey,
    breakdown: ScoreBreakdown,
    total_score: f64,
    last_calculated_at: DateTime<Utc>,
}

impl InterestScore {
    pub fn new(key: InterestKey, breakdown: ScoreBreakdown, calculated_at: DateTime<Utc>) -> Self {
        Self {
            key,
            breakdown,
            total_score: breakdown.total(),
            last_calculated_at: calculated_at,
        }
    }

    pub fn key(&self) -> &InterestKey {
        &self.key
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn view_score(&self) -> f64 {
        self.breakdown.view_score
    }

    pub fn engagement_score(&self) -> f64 {
        self.breakdown.engagement_score
    }

    pub fn time_score(&self) -> f64 {
        self.breakdown.time_score
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn last_calculated_at(&self) -> DateTime<Utc> {
        self.last_calculated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_weighted_sum() {
        let breakdown = ScoreBreakdown {
            view_score: 100.0,
            engagement_score: 130.0,
            time_score: 60.0,
        };
        assert!((breakdown.total() - 107.0).abs() < 1e-9);
    }

    #[test]
    fn test_interest_score_derives_total() {
        let key = InterestKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let breakdown = ScoreBreakdown {
            view_score: 10.0,
            engagement_score: -25.0,
            time_score: 0.0,
        };
        let score = InterestScore::new(key, breakdown, Utc::now());

        assert!((score.total_score() - (3.0 - 12.5)).abs() < 1e-9);
        assert_eq!(score.key(), &key);
    }
}
