use std::time::Duration;

use leadflow_core::{IcebreakerStats, LifecycleUpdate, PipelineProgress, PipelineStatus};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use crate::poller::PollerHandle;
use crate::store::PipelineStore;
use crate::SyncError;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

enum DetailTick {
    Stats(IcebreakerStats),
    /// Completed or gone; nothing left to follow.
    Finished,
}

/// Follows one pipeline's icebreaker generation.
///
/// Every tick first checks the pipeline's status and stops once it is
/// completed. Otherwise it recounts the contacts' icebreaker flags and
/// promotes the pipeline to completed when its stage already says the
/// icebreakers are ready.
#[derive(Debug)]
pub struct DetailPoller {
    pipeline_id: Uuid,
    stats: watch::Receiver<IcebreakerStats>,
    poller: Option<PollerHandle>,
}

impl DetailPoller {
    /// Loads the current stats and starts polling unless the pipeline is
    /// already completed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PipelineNotFound`] if no pipeline has this id, or
    /// [`SyncError::Store`] if the initial reads fail.
    pub async fn start<S: PipelineStore>(
        store: S,
        pipeline_id: Uuid,
        interval: Duration,
    ) -> Result<Self, SyncError> {
        let progress = store
            .pipeline_progress(pipeline_id)
            .await?
            .ok_or(SyncError::PipelineNotFound(pipeline_id))?;
        let stats = load_stats(&store, pipeline_id, progress).await?;
        let (tx, rx) = watch::channel(stats);

        let poller = if progress.status == PipelineStatus::Completed {
            tracing::debug!(%pipeline_id, "pipeline already completed, detail poller not started");
            None
        } else {
            tracing::info!(%pipeline_id, interval = ?interval, "detail poller started");
            let interval = interval.max(MIN_INTERVAL);
            Some(PollerHandle::spawn(move |shutdown| {
                run_detail_poller(store, pipeline_id, interval, tx, shutdown)
            }))
        };

        Ok(Self {
            pipeline_id,
            stats: rx,
            poller,
        })
    }

    #[must_use]
    pub fn pipeline_id(&self) -> Uuid {
        self.pipeline_id
    }

    /// Latest icebreaker counts.
    #[must_use]
    pub fn stats(&self) -> IcebreakerStats {
        *self.stats.borrow()
    }

    /// A receiver that wakes on every stats update and closes when polling
    /// ends.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IcebreakerStats> {
        self.stats.clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
            tracing::debug!(pipeline_id = %self.pipeline_id, "detail poller stopped");
        }
    }
}

impl Drop for DetailPoller {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Counts the flags, then promotes the pipeline if its icebreakers are ready
/// but its status lags behind.
async fn load_stats<S: PipelineStore>(
    store: &S,
    pipeline_id: Uuid,
    progress: PipelineProgress,
) -> Result<IcebreakerStats, SyncError> {
    let stats = IcebreakerStats::from_flags(store.contact_flags(pipeline_id).await?);

    if progress.needs_completion_promotion() {
        store
            .apply_lifecycle(pipeline_id, LifecycleUpdate::COMPLETED)
            .await?;
        tracing::info!(%pipeline_id, "icebreakers ready, pipeline marked completed");
    }
    Ok(stats)
}

async fn detail_tick<S: PipelineStore>(
    store: &S,
    pipeline_id: Uuid,
) -> Result<DetailTick, SyncError> {
    let Some(progress) = store.pipeline_progress(pipeline_id).await? else {
        tracing::info!(%pipeline_id, "pipeline no longer exists");
        return Ok(DetailTick::Finished);
    };
    if progress.status == PipelineStatus::Completed {
        return Ok(DetailTick::Finished);
    }
    Ok(DetailTick::Stats(load_stats(store, pipeline_id, progress).await?))
}

async fn run_detail_poller<S: PipelineStore>(
    store: S,
    pipeline_id: Uuid,
    interval: Duration,
    stats: watch::Sender<IcebreakerStats>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut issued: u64 = 0;
    let mut applied: u64 = 0;
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                issued += 1;
                let seq = issued;
                let store = store.clone();
                in_flight.spawn(async move { (seq, detail_tick(&store, pipeline_id).await) });
            }
            Some(joined) = in_flight.join_next() => match joined {
                Ok((_, Ok(DetailTick::Finished))) => {
                    tracing::info!(%pipeline_id, "pipeline completed, detail poller stopping");
                    break;
                }
                Ok((seq, Ok(DetailTick::Stats(latest)))) => {
                    if seq > applied {
                        applied = seq;
                        stats.send_replace(latest);
                    } else {
                        tracing::debug!(
                            %pipeline_id,
                            seq,
                            applied,
                            "discarding stale icebreaker stats"
                        );
                    }
                }
                Ok((seq, Err(error))) => {
                    tracing::warn!(%pipeline_id, seq, error = %error, "detail poll failed");
                }
                Err(error) => {
                    tracing::warn!(%pipeline_id, error = %error, "detail poll task failed");
                }
            },
        }
    }
}
