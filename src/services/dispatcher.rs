use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{models::BusinessContext, services::aggregator::ScoreAggregator};

/// One pending interest-score recompute
#[derive(Debug, Clone)]
pub struct RescoreJob {
    pub actor_id: Uuid,
    pub item_id: Uuid,
    pub context: BusinessContext,
}

/// Why a job was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleRejection {
    QueueFull,
    ShutDown,
}

/// Hands recompute jobs to a fixed pool of background workers.
///
/// Scheduling never waits: when the queue is full the job is logged and
/// dropped. The next interaction on the same pair schedules a fresh recompute
/// from the full ledger anyway.
#[derive(Clone)]
pub struct RescoreDispatcher {
    tx: mpsc::Sender<RescoreJob>,
}

/// Handle for stopping the workers after they drain the queue
pub struct RescoreWorkersHandle {
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl RescoreWorkersHandle {
    /// Stops accepting new work, runs every queued job, and waits for the
    /// workers to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        tracing::info!(workers = self.workers.len(), "Rescore workers shutting down");

        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Rescore worker task failed");
            }
        }

        tracing::info!("Rescore workers stopped");
    }
}

impl RescoreDispatcher {
    /// Spawns `workers` background tasks consuming a queue of
    /// `queue_capacity` jobs
    pub fn start(
        aggregator: ScoreAggregator,
        queue_capacity: usize,
        workers: usize,
    ) -> (Self, RescoreWorkersHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let aggregator = aggregator.clone();
                let rx = rx.clone();
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    Self::worker_task(worker_id, aggregator, rx, shutdown_rx).await;
                })
            })
            .collect();

        (
            Self { tx },
            RescoreWorkersHandle {
                shutdown_tx,
                workers,
            },
        )
    }

    /// Queues a recompute without waiting for it
    pub fn schedule(&self, job: RescoreJob) -> Result<(), ScheduleRejection> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    actor_id = %job.actor_id,
                    item_id = %job.item_id,
                    "Rescore queue full, dropping recompute"
                );
                Err(ScheduleRejection::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(
                    actor_id = %job.actor_id,
                    item_id = %job.item_id,
                    "Rescore workers stopped, dropping recompute"
                );
                Err(ScheduleRejection::ShutDown)
            }
        }
    }

    async fn worker_task(
        worker_id: usize,
        aggregator: ScoreAggregator,
        rx: Arc<Mutex<mpsc::Receiver<RescoreJob>>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        tracing::debug!(worker_id, "Rescore worker started");

        loop {
            let next = {
                let mut rx = rx.lock().await;
                if *shutdown_rx.borrow() {
                    rx.close();
                    None
                } else {
                    tokio::select! {
                        job = rx.recv() => job,
                        Ok(()) = shutdown_rx.changed() => {
                            rx.close();
                            None
                        }
                    }
                }
            };

            match next {
                Some(job) => Self::run(worker_id, &aggregator, job).await,
                None => break,
            }
        }

        // Finish whatever was queued before shutdown
        loop {
            let next = rx.lock().await.try_recv().ok();
            match next {
                Some(job) => Self::run(worker_id, &aggregator, job).await,
                None => break,
            }
        }

        tracing::debug!(worker_id, "Rescore worker stopped");
    }

    async fn run(worker_id: usize, aggregator: &ScoreAggregator, job: RescoreJob) {
        if let Err(e) = aggregator
            .recompute(job.actor_id, job.item_id, &job.context)
            .await
        {
            tracing::error!(
                worker_id,
                actor_id = %job.actor_id,
                item_id = %job.item_id,
                error = %e,
                "Background recompute failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::{InteractionEvent, InteractionKind, InteractionMetadata, InterestKey};
    use crate::services::{collaborators::ScoreStore, ledger::InteractionLedger};

    fn job(context: &BusinessContext, actor_id: Uuid, item_id: Uuid) -> RescoreJob {
        RescoreJob {
            actor_id,
            item_id,
            context: context.clone(),
        }
    }

    #[tokio::test]
    async fn test_scheduled_jobs_run_before_shutdown_completes() {
        let store = Arc::new(MemoryStore::new());
        let aggregator = ScoreAggregator::new(store.clone(), store.clone());
        let (dispatcher, handle) = RescoreDispatcher::start(aggregator, 16, 2);
        let context = BusinessContext::new(None, None);
        let actor = Uuid::new_v4();

        let items: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for item in &items {
            store
                .append(InteractionEvent::new(
                    actor,
                    *item,
                    InteractionKind::Click,
                    InteractionMetadata::default(),
                ))
                .await
                .unwrap();
            tokio_test::assert_ok!(dispatcher.schedule(job(&context, actor, *item)));
        }

        handle.shutdown().await;

        assert_eq!(store.score_count().await, items.len());
        let key = InterestKey::new(actor, context.id, items[0]);
        let score = store.get_interest(&key).await.unwrap().unwrap();
        assert!((score.engagement_score() - 40.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_schedule_after_shutdown_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let aggregator = ScoreAggregator::new(store.clone(), store.clone());
        let (dispatcher, handle) = RescoreDispatcher::start(aggregator, 4, 1);
        handle.shutdown().await;

        let context = BusinessContext::new(None, None);
        let result = dispatcher.schedule(job(&context, Uuid::new_v4(), Uuid::new_v4()));
        assert_eq!(result, Err(ScheduleRejection::ShutDown));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        // Hold the receiver so no worker can drain the queue
        let (tx, _rx) = mpsc::channel(1);
        let dispatcher = RescoreDispatcher { tx };

        let context = BusinessContext::new(None, None);
        assert!(dispatcher
            .schedule(job(&context, Uuid::new_v4(), Uuid::new_v4()))
            .is_ok());
        assert_eq!(
            dispatcher.schedule(job(&context, Uuid::new_v4(), Uuid::new_v4())),
            Err(ScheduleRejection::QueueFull)
        );
    }
}
