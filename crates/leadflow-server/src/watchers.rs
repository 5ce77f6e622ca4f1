use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use leadflow_core::IcebreakerStats;
use leadflow_sync::{DetailPoller, PipelineStore, SyncError};
use uuid::Uuid;

/// Detail pollers for the pipelines clients are currently looking at.
///
/// A poller is started on the first stats request for a pipeline and kept
/// until it finishes on its own or the pipeline is deleted.
#[derive(Clone)]
pub struct DetailWatchers {
    interval: Duration,
    pollers: Arc<Mutex<HashMap<Uuid, DetailPoller>>>,
}

impl DetailWatchers {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pollers: Arc::default(),
        }
    }

    /// Latest icebreaker stats, starting a poller if none is running.
    pub async fn stats<S: PipelineStore>(
        &self,
        store: &S,
        pipeline_id: Uuid,
    ) -> Result<IcebreakerStats, SyncError> {
        if let Some(stats) = self.running_stats(pipeline_id) {
            return Ok(stats);
        }

        let poller = DetailPoller::start(store.clone(), pipeline_id, self.interval).await?;
        let stats = poller.stats();
        if poller.is_running() {
            // a concurrent request may have won; its poller stays
            self.lock().entry(pipeline_id).or_insert(poller);
        }
        Ok(stats)
    }

    pub fn forget(&self, pipeline_id: Uuid) {
        self.lock().remove(&pipeline_id);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn watched(&self) -> usize {
        let mut pollers = self.lock();
        pollers.retain(|_, p| p.is_running());
        pollers.len()
    }

    fn running_stats(&self, pipeline_id: Uuid) -> Option<IcebreakerStats> {
        let mut pollers = self.lock();
        pollers.retain(|_, p| p.is_running());
        pollers.get(&pipeline_id).map(DetailPoller::stats)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, DetailPoller>> {
        self.pollers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
