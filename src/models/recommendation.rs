use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CatalogItem, Category};

/// Where a recommended item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Scored and ordered by the personalized ranking
    Ranked,
    /// Appended from the non-personalized recency list
    Filled,
}

/// A candidate scored for one ranking request. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub item: CatalogItem,
    pub interest_score: f64,
    pub region_score: f64,
    pub age_score: f64,
    pub recency_score: f64,
    pub priority_score: f64,
}

/// One entry of a ranked recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: Uuid,
    pub category: Category,
    /// `None` for filled entries
    pub priority_score: Option<f64>,
    pub provenance: Provenance,
}

impl Recommendation {
    pub fn ranked(candidate: &RankedCandidate) -> Self {
        Self {
            item_id: candidate.item.id,
            category: candidate.item.category,
            priority_score: Some(candidate.priority_score),
            provenance: Provenance::Ranked,
        }
    }

    pub fn filled(item: &CatalogItem) -> Self {
        Self {
            item_id: item.id,
            category: item.category,
            priority_score: None,
            provenance: Provenance::Filled,
        }
    }
}

/// A ranked list as stored in the recommendation cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecommendations {
    /// When the ranking pass that produced this list started
    pub generated_at: DateTime<Utc>,
    pub items: Vec<Recommendation>,
}
