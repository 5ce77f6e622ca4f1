//! Live integration tests for leadflow-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL` pointing at a server where
//! the test user may create databases, so they are ignored by default:
//! run them with `cargo test -p leadflow-db -- --ignored`.

use leadflow_core::{
    CampaignKind, IcebreakerStats, LifecycleUpdate, NewPipeline, PipelineAction, PipelineStage,
    PipelineStatus,
};
use leadflow_db::{
    apply_lifecycle, count_contacts, create_pipeline, delete_all_pipelines, delete_pipeline,
    delete_unresolved_lead, get_pipeline, get_pipeline_progress, list_contact_flags,
    list_contacts, list_pipelines, list_unresolved_leads, DbError,
};
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_pipeline(name: &str) -> NewPipeline {
    NewPipeline {
        name: name.to_string(),
        instruction: String::new(),
        campaign_kind: CampaignKind::Email,
        external_campaign_id: "camp-1".to_string(),
        criteria: json!({"hasEmail": true, "totalResults": 50, "personCountry": ["France"]}),
        target_lead_count: Some(50),
    }
}

async fn insert_contact(pool: &sqlx::PgPool, pipeline_id: Uuid, flags: (Option<bool>, Option<bool>, Option<bool>)) {
    sqlx::query(
        "INSERT INTO pipeline_contacts (pipeline_id, full_name, is_network_post, is_deep_search, is_generic) \
         VALUES ($1, 'Test Contact', $2, $3, $4)",
    )
    .bind(pipeline_id)
    .bind(flags.0)
    .bind(flags.1)
    .bind(flags.2)
    .execute(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_contact failed: {e}"));
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn created_pipeline_starts_in_creation_state(pool: sqlx::PgPool) {
    let created = create_pipeline(&pool, &new_pipeline("Paris SaaS"))
        .await
        .expect("create_pipeline failed");

    assert_eq!(created.status, PipelineStatus::Pending);
    assert_eq!(created.stage, PipelineStage::CriteriaSaved);
    assert_eq!(created.action, PipelineAction::LaunchPrompt);
    assert_eq!(created.target_lead_count, Some(50));
    assert_eq!(
        created.parsed_criteria().expect("criteria should parse"),
        json!({"hasEmail": true, "totalResults": 50, "personCountry": ["France"]})
    );
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn pipelines_are_listed_newest_first(pool: sqlx::PgPool) {
    let first = create_pipeline(&pool, &new_pipeline("first")).await.unwrap();
    sqlx::query("UPDATE pipelines SET created_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(first.id)
        .execute(&pool)
        .await
        .unwrap();
    let second = create_pipeline(&pool, &new_pipeline("second")).await.unwrap();

    let ids: Vec<Uuid> = list_pipelines(&pool).await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn launch_then_rollback_restores_creation_state(pool: sqlx::PgPool) {
    let p = create_pipeline(&pool, &new_pipeline("rollback")).await.unwrap();

    apply_lifecycle(&pool, p.id, LifecycleUpdate::LAUNCHED).await.unwrap();
    let launched = get_pipeline(&pool, p.id).await.unwrap().unwrap();
    assert_eq!(launched.status, PipelineStatus::InProgress);
    assert_eq!(launched.stage, PipelineStage::LeadsGenerating);
    assert_eq!(launched.action, PipelineAction::Launched);

    apply_lifecycle(&pool, p.id, LifecycleUpdate::ROLLBACK).await.unwrap();
    let reverted = get_pipeline(&pool, p.id).await.unwrap().unwrap();
    assert_eq!(reverted.status, PipelineStatus::Pending);
    assert_eq!(reverted.stage, PipelineStage::CriteriaSaved);
    assert_eq!(reverted.action, PipelineAction::LaunchPrompt);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn completion_update_keeps_stage(pool: sqlx::PgPool) {
    let p = create_pipeline(&pool, &new_pipeline("complete")).await.unwrap();
    sqlx::query("UPDATE pipelines SET status = 'in_progress', stage = 'icebreakers_ready' WHERE id = $1")
        .bind(p.id)
        .execute(&pool)
        .await
        .unwrap();

    apply_lifecycle(&pool, p.id, LifecycleUpdate::COMPLETED).await.unwrap();
    let progress = get_pipeline_progress(&pool, p.id).await.unwrap().unwrap();
    assert_eq!(progress.status, PipelineStatus::Completed);
    assert_eq!(progress.stage, PipelineStage::IcebreakersReady);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn lifecycle_update_on_missing_pipeline_is_not_found(pool: sqlx::PgPool) {
    let result = apply_lifecycle(&pool, Uuid::new_v4(), LifecycleUpdate::LAUNCHED).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn deleting_pipeline_cascades_to_contacts(pool: sqlx::PgPool) {
    let p = create_pipeline(&pool, &new_pipeline("cascade")).await.unwrap();
    insert_contact(&pool, p.id, (Some(true), None, None)).await;
    assert_eq!(count_contacts(&pool, p.id).await.unwrap(), 1);

    delete_pipeline(&pool, p.id).await.unwrap();
    assert_eq!(count_contacts(&pool, p.id).await.unwrap(), 0);
    assert!(matches!(delete_pipeline(&pool, p.id).await, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn delete_all_reports_count(pool: sqlx::PgPool) {
    create_pipeline(&pool, &new_pipeline("a")).await.unwrap();
    create_pipeline(&pool, &new_pipeline("b")).await.unwrap();
    assert_eq!(delete_all_pipelines(&pool).await.unwrap(), 2);
    assert!(list_pipelines(&pool).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Contacts and unresolved leads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn contact_flags_feed_icebreaker_stats(pool: sqlx::PgPool) {
    let p = create_pipeline(&pool, &new_pipeline("flags")).await.unwrap();
    insert_contact(&pool, p.id, (Some(true), Some(false), Some(false))).await;
    insert_contact(&pool, p.id, (None, Some(true), None)).await;
    insert_contact(&pool, p.id, (None, None, None)).await;

    let stats = IcebreakerStats::from_flags(list_contact_flags(&pool, p.id).await.unwrap());
    assert_eq!(stats.total, 3);
    assert_eq!(stats.network_post, 1);
    assert_eq!(stats.deep_search, 1);
    assert_eq!(stats.pending, 1);

    let contacts = list_contacts(&pool, p.id).await.unwrap();
    assert_eq!(contacts.len(), 3);
    assert!(contacts.iter().all(|c| c.pipeline_id == p.id));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn unresolved_lead_delete_is_terminal(pool: sqlx::PgPool) {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO unresolved_response_leads (full_name, reply_source, reply_html) \
         VALUES ('Anna Kovacs', 'LinkedIn', '<p>Maybe</p>') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(list_unresolved_leads(&pool).await.unwrap().len(), 1);
    delete_unresolved_lead(&pool, id).await.unwrap();
    assert!(list_unresolved_leads(&pool).await.unwrap().is_empty());
    assert!(matches!(
        delete_unresolved_lead(&pool, id).await,
        Err(DbError::NotFound)
    ));
}
