mod actor;
mod catalog;
mod interaction;
mod recommendation;
mod score;

pub use actor::{Actor, BusinessContext};
pub use catalog::{AgeCondition, CatalogItem, Category, RegionRef, RegionScope};
pub use interaction::{InteractionEvent, InteractionKind, InteractionMetadata};
pub use recommendation::{CachedRecommendations, Provenance, RankedCandidate, Recommendation};
pub use score::{InterestKey, InterestScore, ScoreBreakdown};
