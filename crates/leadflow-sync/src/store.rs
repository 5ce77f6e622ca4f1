use std::future::Future;

use leadflow_core::{IcebreakerFlags, LifecycleUpdate, Pipeline, PipelineProgress};
use leadflow_db::DbError;
use sqlx::PgPool;
use uuid::Uuid;

/// The reads and writes the pollers and the launch flow need.
///
/// Implemented for [`PgPool`]; tests substitute an in-memory store.
pub trait PipelineStore: Clone + Send + Sync + 'static {
    /// All pipelines, newest first.
    fn list_pipelines(&self) -> impl Future<Output = Result<Vec<Pipeline>, DbError>> + Send;

    fn get_pipeline(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Pipeline>, DbError>> + Send;

    /// Status and stage only.
    fn pipeline_progress(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<PipelineProgress>, DbError>> + Send;

    fn contact_flags(
        &self,
        pipeline_id: Uuid,
    ) -> impl Future<Output = Result<Vec<IcebreakerFlags>, DbError>> + Send;

    fn apply_lifecycle(
        &self,
        id: Uuid,
        update: LifecycleUpdate,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

impl PipelineStore for PgPool {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, DbError> {
        leadflow_db::list_pipelines(self).await
    }

    async fn get_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>, DbError> {
        leadflow_db::get_pipeline(self, id).await
    }

    async fn pipeline_progress(&self, id: Uuid) -> Result<Option<PipelineProgress>, DbError> {
        leadflow_db::get_pipeline_progress(self, id).await
    }

    async fn contact_flags(&self, pipeline_id: Uuid) -> Result<Vec<IcebreakerFlags>, DbError> {
        leadflow_db::list_contact_flags(self, pipeline_id).await
    }

    async fn apply_lifecycle(&self, id: Uuid, update: LifecycleUpdate) -> Result<(), DbError> {
        leadflow_db::apply_lifecycle(self, id, update).await
    }
}
