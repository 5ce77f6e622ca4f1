//! Pipeline command handlers for the CLI.
//!
//! `create` drives the same wizard the dashboard uses, one step at a time,
//! so a pipeline created here passes exactly the same gates. `launch` goes
//! through the sync crate's launch flow and therefore rolls back on a
//! failed webhook call.

mod create;
mod lifecycle;
mod query;

use std::path::PathBuf;

use clap::Subcommand;
use leadflow_core::{CampaignKind, PipelineStatus};
use uuid::Uuid;

pub(crate) use create::run_pipelines_create;
pub(crate) use lifecycle::{run_pipelines_delete, run_pipelines_launch};
pub(crate) use query::run_pipelines_list;

/// Sub-commands available under `pipelines`.
#[derive(Debug, Subcommand)]
pub enum PipelinesCommands {
    /// List pipelines, newest first
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
        /// Only pipelines with this status (pending, in_progress, completed, error)
        #[arg(long)]
        status: Option<PipelineStatus>,
    },
    /// Create a pipeline through the creation wizard
    Create {
        #[arg(long)]
        name: String,
        /// Instruction forwarded to the workflow engine
        #[arg(long, default_value = "")]
        instruction: String,
        /// Campaign kind (email or linkedin)
        #[arg(long, default_value = "email")]
        kind: CampaignKind,
        /// Cold-email platform campaign id; required for email campaigns
        #[arg(long)]
        campaign: Option<String>,
        /// Search criteria as inline JSON
        #[arg(long, conflicts_with = "criteria_file", required_unless_present = "criteria_file")]
        criteria: Option<String>,
        /// Read the search criteria JSON from a file
        #[arg(long)]
        criteria_file: Option<PathBuf>,
        /// Acknowledge the messaging network's outreach caps
        #[arg(long)]
        yes: bool,
        /// Validate and print the submission without writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a pipeline to the workflow engine
    Launch { id: Uuid },
    /// Delete one pipeline, or all of them with --all
    Delete {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<Uuid>,
        #[arg(long)]
        all: bool,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &leadflow_core::AppConfig,
    command: PipelinesCommands,
) -> anyhow::Result<()> {
    match command {
        PipelinesCommands::List { search, status } => {
            run_pipelines_list(pool, search, status).await
        }
        PipelinesCommands::Create {
            name,
            instruction,
            kind,
            campaign,
            criteria,
            criteria_file,
            yes,
            dry_run,
        } => {
            let criteria = match (criteria, criteria_file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("failed to read criteria file {}: {e}", path.display())
                })?,
                (None, None) => anyhow::bail!("--criteria or --criteria-file is required"),
            };
            let input = create::CreateInput {
                name,
                instruction,
                kind,
                campaign,
                criteria,
                acknowledge_caps: yes,
            };
            run_pipelines_create(pool, input, dry_run).await
        }
        PipelinesCommands::Launch { id } => run_pipelines_launch(pool, config, id).await,
        PipelinesCommands::Delete { id, all } => run_pipelines_delete(pool, id, all).await,
    }
}
