//! The pipeline list poller.
//!
//! While at least one pipeline is generating leads the engine re-reads the
//! whole list on a fixed interval, reports pipelines whose icebreakers became
//! ready, and goes idle again as soon as nothing is progressing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use leadflow_core::{newly_completed, should_poll, Pipeline, PipelineStage};
use leadflow_db::{ChangeTable, RowChange};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::poller::PollerHandle;
use crate::store::PipelineStore;
use crate::SyncError;

const COMPLETIONS_CAPACITY: usize = 64;
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Pipelines in the current snapshot.
    pub tracked: usize,
    /// Pipelines currently generating leads.
    pub active: usize,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: Vec<Pipeline>,
    /// Last sequence number handed out.
    issued: u64,
    /// Sequence number of the result the snapshot came from.
    applied: u64,
    poller: Option<PollerHandle>,
}

struct EngineCore<S> {
    store: S,
    interval: Duration,
    inner: Mutex<Inner>,
    completions: broadcast::Sender<Pipeline>,
}

/// Owns the pipeline snapshot and the list poller.
///
/// Dropping the engine aborts the poller and any fetch still in flight.
pub struct SyncEngine<S: PipelineStore> {
    core: Arc<EngineCore<S>>,
}

impl<S: PipelineStore> SyncEngine<S> {
    #[must_use]
    pub fn new(store: S, interval: Duration) -> Self {
        let (completions, _) = broadcast::channel(COMPLETIONS_CAPACITY);
        Self {
            core: Arc::new(EngineCore {
                store,
                interval: interval.max(MIN_INTERVAL),
                inner: Mutex::new(Inner::default()),
                completions,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.core.store
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.core.interval
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.core.lock().state()
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        let inner = self.core.lock();
        SyncStatus {
            state: inner.state(),
            tracked: inner.snapshot.len(),
            active: inner
                .snapshot
                .iter()
                .filter(|p| p.is_generating_leads())
                .count(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Pipeline> {
        self.core.lock().snapshot.clone()
    }

    /// Pipelines that just became ready, one message per transition.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Pipeline> {
        self.core.completions.subscribe()
    }

    /// Replaces the snapshot with a list read elsewhere and starts or stops
    /// polling to match it. Results of fetches already in flight are
    /// discarded.
    pub fn observe(&self, pipelines: Vec<Pipeline>) -> SyncState {
        let mut inner = self.core.lock();
        inner.issued += 1;
        inner.applied = inner.issued;
        inner.snapshot = pipelines;
        self.core.reconcile(&mut inner)
    }

    /// Initial load.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the list cannot be read.
    pub async fn start(&self) -> Result<SyncState, SyncError> {
        let state = self.reload().await?;
        tracing::info!(?state, interval = ?self.core.interval, "sync engine started");
        Ok(state)
    }

    /// Reads the full list now and applies it like a tick would.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the list cannot be read.
    pub async fn reload(&self) -> Result<SyncState, SyncError> {
        let seq = self.core.next_seq();
        let pipelines = self.core.store.list_pipelines().await?;
        Ok(self.core.apply(seq, pipelines))
    }

    /// Reloads when another writer touched the pipelines table, so an idle
    /// engine picks up launches it did not make. Other tables are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the list cannot be read.
    pub async fn handle_change(&self, change: &RowChange) -> Result<Option<SyncState>, SyncError> {
        if change.table != ChangeTable::Pipelines {
            return Ok(None);
        }
        tracing::debug!(id = %change.id, op = ?change.op, "pipeline row changed");
        self.reload().await.map(Some)
    }

    /// Stops polling. A later [`observe`](Self::observe) or
    /// [`reload`](Self::reload) may start it again.
    pub fn stop(&self) {
        let mut inner = self.core.lock();
        if let Some(poller) = inner.poller.take() {
            poller.stop();
            tracing::info!("list poller stopped");
        }
    }
}

impl<S: PipelineStore> Drop for SyncEngine<S> {
    fn drop(&mut self) {
        if let Some(poller) = self.core.lock().poller.take() {
            poller.abort();
        }
    }
}

impl Inner {
    fn state(&self) -> SyncState {
        if self.poller.is_some() {
            SyncState::Polling
        } else {
            SyncState::Idle
        }
    }
}

impl<S: PipelineStore> EngineCore<S> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_seq(&self) -> u64 {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.issued
    }

    /// Applies a fetched list unless a newer result already landed.
    fn apply(self: &Arc<Self>, seq: u64, pipelines: Vec<Pipeline>) -> SyncState {
        let mut inner = self.lock();
        if seq <= inner.applied {
            tracing::debug!(seq, applied = inner.applied, "discarding stale pipeline list");
            return inner.state();
        }
        inner.applied = seq;

        for pipeline in newly_completed(&inner.snapshot, &pipelines) {
            tracing::info!(
                pipeline_id = %pipeline.id,
                name = %pipeline.name,
                "pipeline completed, icebreakers ready"
            );
            // no subscribers is fine
            let _ = self.completions.send(pipeline.clone());
        }
        log_progress(&pipelines);

        inner.snapshot = pipelines;
        self.reconcile(&mut inner)
    }

    fn reconcile(self: &Arc<Self>, inner: &mut Inner) -> SyncState {
        let wanted = should_poll(&inner.snapshot);
        match (wanted, inner.poller.take()) {
            (true, None) => {
                let core = Arc::clone(self);
                inner.poller = Some(PollerHandle::spawn(move |shutdown| {
                    run_list_poller(core, shutdown)
                }));
                tracing::info!(interval = ?self.interval, "list poller started");
            }
            (false, Some(poller)) => {
                poller.stop();
                tracing::info!("no pipeline generating leads, list poller stopped");
            }
            (_, poller) => inner.poller = poller,
        }
        inner.state()
    }
}

async fn run_list_poller<S: PipelineStore>(
    core: Arc<EngineCore<S>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(core.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let seq = core.next_seq();
                let store = core.store.clone();
                tracing::debug!(seq, "pipeline list tick");
                in_flight.spawn(async move { (seq, store.list_pipelines().await) });
            }
            Some(joined) = in_flight.join_next() => match joined {
                Ok((seq, Ok(pipelines))) => {
                    core.apply(seq, pipelines);
                }
                Ok((seq, Err(error))) => {
                    tracing::warn!(seq, error = %error, "pipeline list fetch failed");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "pipeline list fetch task failed");
                }
            },
        }
    }
    tracing::debug!("list poller exited");
}

fn log_progress(pipelines: &[Pipeline]) {
    for pipeline in pipelines.iter().filter(|p| p.is_generating_leads()) {
        match (pipeline.stage, pipeline.lead_progress()) {
            (PipelineStage::LeadsGenerated, Some(progress)) => tracing::debug!(
                pipeline_id = %pipeline.id,
                name = %pipeline.name,
                processed = progress.processed,
                target = progress.target,
                percent = progress.percent(),
                "lead processing progress"
            ),
            _ => tracing::debug!(
                pipeline_id = %pipeline.id,
                name = %pipeline.name,
                "lead generation running"
            ),
        }
    }
}
