use uuid::Uuid;

use crate::{error::AppResult, models::InteractionEvent};

/// How much history to keep for one (actor, item) pair when compacting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Never drop anything
    #[default]
    KeepAll,
    /// Keep only the newest `n` events
    KeepLatest(usize),
}

impl RetentionPolicy {
    /// Ids of the events this policy would drop
    pub fn expired(&self, events: &[InteractionEvent]) -> Vec<Uuid> {
        match self {
            RetentionPolicy::KeepAll => Vec::new(),
            RetentionPolicy::KeepLatest(keep) => {
                let mut ordered: Vec<&InteractionEvent> = events.iter().collect();
                ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                ordered.into_iter().skip(*keep).map(|e| e.id).collect()
            }
        }
    }
}

/// Append-only log of interaction events.
///
/// Events are never edited. Compaction is the only way history shrinks, and it
/// is never triggered by this crate on its own.
#[async_trait::async_trait]
pub trait InteractionLedger: Send + Sync {
    /// Appends one event
    async fn append(&self, event: InteractionEvent) -> AppResult<()>;

    /// Every event recorded for the pair, in no particular order
    async fn events_for(&self, actor_id: Uuid, item_id: Uuid) -> AppResult<Vec<InteractionEvent>>;

    /// Applies a retention policy to the pair's history, returning how many
    /// events were removed.
    ///
    /// Dropping events changes what the next recompute sees.
    async fn compact(
        &self,
        actor_id: Uuid,
        item_id: Uuid,
        policy: RetentionPolicy,
    ) -> AppResult<usize>;
}
