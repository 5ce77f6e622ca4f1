use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use leadflow_core::{
    CampaignKind, IcebreakerFlags, LifecycleUpdate, Pipeline, PipelineAction, PipelineProgress,
    PipelineStage, PipelineStatus,
};
use leadflow_db::DbError;
use leadflow_webhook::{WebhookError, WebhookPayload, WebhookSink};
use uuid::Uuid;

use crate::store::PipelineStore;

pub(crate) fn pipeline(status: PipelineStatus, stage: PipelineStage) -> Pipeline {
    Pipeline {
        id: Uuid::new_v4(),
        name: "Nantes agencies".to_string(),
        instruction: String::new(),
        campaign_kind: CampaignKind::Network,
        external_campaign_id: String::new(),
        criteria: r#"{"totalResults":100}"#.to_string(),
        status,
        stage,
        action: PipelineAction::LaunchPrompt,
        target_lead_count: Some(100),
        leads_processed: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub(crate) fn generating() -> Pipeline {
    pipeline(PipelineStatus::InProgress, PipelineStage::LeadsGenerating)
}

pub(crate) fn processed(mut pipeline: Pipeline, count: i32) -> Pipeline {
    pipeline.stage = PipelineStage::LeadsGenerated;
    pipeline.leads_processed = Some(count);
    pipeline
}

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub pipelines: Vec<Pipeline>,
    pub flags: HashMap<Uuid, Vec<IcebreakerFlags>>,
    pub list_calls: usize,
    pub progress_calls: usize,
    /// Delays applied to successive list calls, after the data is read.
    pub list_delays: VecDeque<Duration>,
    pub failing_lists: usize,
    pub failing_updates: Vec<LifecycleUpdate>,
    pub writes: Vec<(Uuid, LifecycleUpdate)>,
}

/// In-memory [`PipelineStore`] shared between a test and the pollers.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub(crate) fn with_pipelines(pipelines: Vec<Pipeline>) -> Self {
        let store = Self::default();
        store.lock().pipelines = pipelines;
        store
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn pipeline(&self, id: Uuid) -> Pipeline {
        self.lock()
            .pipelines
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("pipeline should exist in the fake store")
    }

    pub(crate) fn replace(&self, pipeline: Pipeline) {
        let mut state = self.lock();
        if let Some(slot) = state.pipelines.iter_mut().find(|p| p.id == pipeline.id) {
            *slot = pipeline;
        }
    }
}

impl PipelineStore for FakeStore {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, DbError> {
        let (result, delay) = {
            let mut state = self.lock();
            state.list_calls += 1;
            let delay = state.list_delays.pop_front();
            let result = if state.failing_lists > 0 {
                state.failing_lists -= 1;
                Err(unavailable())
            } else {
                Ok(state.pipelines.clone())
            };
            (result, delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn get_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>, DbError> {
        Ok(self.lock().pipelines.iter().find(|p| p.id == id).cloned())
    }

    async fn pipeline_progress(&self, id: Uuid) -> Result<Option<PipelineProgress>, DbError> {
        let mut state = self.lock();
        state.progress_calls += 1;
        Ok(state
            .pipelines
            .iter()
            .find(|p| p.id == id)
            .map(Pipeline::progress))
    }

    async fn contact_flags(&self, pipeline_id: Uuid) -> Result<Vec<IcebreakerFlags>, DbError> {
        Ok(self
            .lock()
            .flags
            .get(&pipeline_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_lifecycle(&self, id: Uuid, update: LifecycleUpdate) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.failing_updates.contains(&update) {
            return Err(unavailable());
        }
        let pipeline = state
            .pipelines
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(DbError::NotFound)?;
        pipeline.status = update.status;
        pipeline.action = update.action;
        if let Some(stage) = update.stage {
            pipeline.stage = stage;
        }
        state.writes.push((id, update));
        Ok(())
    }
}

/// Records dispatched payloads; optionally answers with an upstream error.
#[derive(Debug, Default)]
pub(crate) struct FakeSink {
    pub fail: bool,
    pub sent: Mutex<Vec<WebhookPayload>>,
}

impl FakeSink {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<WebhookPayload> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WebhookSink for FakeSink {
    async fn send_pipeline(&self, payload: &WebhookPayload) -> Result<String, WebhookError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        if self.fail {
            return Err(WebhookError::UpstreamStatus {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok("Workflow was started".to_string())
    }
}
