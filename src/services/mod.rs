pub mod age;
pub mod aggregator;
pub mod collaborators;
pub mod dispatcher;
pub mod ledger;
pub mod ranking;
pub mod recommendations;
pub mod region;

pub use aggregator::ScoreAggregator;
pub use dispatcher::{RescoreDispatcher, RescoreWorkersHandle};
pub use ranking::PriorityRankingEngine;
pub use recommendations::{Collaborators, InteractionInput, RankingSettings, RecommendationService};
