mod pipelines;
mod watch;

use clap::{Parser, Subcommand};

use crate::pipelines::PipelinesCommands;

#[derive(Debug, Parser)]
#[command(name = "leadflow-cli")]
#[command(about = "Leadflow operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect, create, launch and delete pipelines
    Pipelines {
        #[command(subcommand)]
        command: PipelinesCommands,
    },
    /// Follow pipeline progress until interrupted
    Watch {
        /// Also follow icebreaker generation and contacts of this pipeline
        #[arg(long)]
        pipeline: Option<uuid::Uuid>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = leadflow_core::load_app_config()?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("leadflow-cli ready; run with --help to list commands");
        return Ok(());
    };

    let pool = leadflow_db::connect_pool_from_config(&config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                leadflow_db::health_check(&pool).await?;
                println!("database is reachable");
            }
            DbCommands::Migrate => {
                let applied = leadflow_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Pipelines { command } => pipelines::run(&pool, &config, command).await?,
        Commands::Watch { pipeline } => watch::run_watch(&pool, &config, pipeline).await?,
    }

    Ok(())
}
