use leadflow_core::{CampaignStats, LeadTotals, Pipeline, PipelineFilter, PipelineStatus};

const NAME_WIDTH: usize = 32;

fn truncate(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        format!("{}...", name.chars().take(NAME_WIDTH - 3).collect::<String>())
    } else {
        name.to_string()
    }
}

fn leads_column(pipeline: &Pipeline) -> String {
    match pipeline.lead_progress() {
        Some(progress) => format!(
            "{}/{} ({}%)",
            progress.processed,
            progress.target,
            progress.percent()
        ),
        None => "-".to_string(),
    }
}

pub(crate) fn format_row(pipeline: &Pipeline) -> String {
    format!(
        "{:<38}{:<35}{:<10}{:<13}{:<22}{:<18}{}",
        pipeline.id.to_string(),
        truncate(&pipeline.name),
        pipeline.campaign_kind.as_str(),
        pipeline.status.as_str(),
        pipeline.stage.as_str(),
        leads_column(pipeline),
        pipeline.created_at.format("%Y-%m-%d %H:%M"),
    )
}

/// List pipelines, newest first, with campaign and lead totals.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_pipelines_list(
    pool: &sqlx::PgPool,
    search: Option<String>,
    status: Option<PipelineStatus>,
) -> anyhow::Result<()> {
    let pipelines = leadflow_db::list_pipelines(pool).await?;
    let filter = PipelineFilter { search, status };
    let shown = filter.apply(&pipelines);

    if shown.is_empty() {
        println!("no pipelines found; create one with `pipelines create`");
        return Ok(());
    }

    println!(
        "{:<38}{:<35}{:<10}{:<13}{:<22}{:<18}CREATED",
        "ID", "NAME", "KIND", "STATUS", "STAGE", "LEADS"
    );
    for pipeline in &shown {
        println!("{}", format_row(pipeline));
    }

    let stats = CampaignStats::from_pipelines(&pipelines);
    let leads = LeadTotals::from_pipelines(&pipelines);
    println!();
    println!(
        "{} campaigns: {} pending, {} in progress ({} generating), {} completed, {} error",
        stats.total, stats.pending, stats.in_progress, stats.generating, stats.completed, stats.error
    );
    println!(
        "leads: {} processed of {} targeted, {} pending",
        leads.processed, leads.target, leads.pending
    );
    Ok(())
}
