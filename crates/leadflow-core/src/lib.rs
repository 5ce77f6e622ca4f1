pub mod app_config;
pub mod config;
pub mod contact;
pub mod criteria;
pub mod feed;
pub mod pipeline;
pub mod stats;
pub mod unresolved;
pub mod wizard;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use contact::{Contact, IcebreakerFlags, IcebreakerKind};
pub use criteria::{parse_criteria, target_lead_count, CriteriaError};
pub use feed::{ChangeEvent, Keyed, LiveCollection};
pub use pipeline::{
    newly_completed, should_poll, CampaignKind, LeadProgress, LifecycleUpdate, NewPipeline,
    Pipeline, PipelineAction, PipelineProgress, PipelineStage, PipelineStatus,
};
pub use stats::{CampaignStats, IcebreakerStats, LeadTotals, PipelineFilter};
pub use unresolved::{split_thread_quote, ReplyChannel, UnresolvedLead};
pub use wizard::{
    Advance, FieldErrors, RateLimitNotice, SubmitError, Wizard, WizardDraft, WizardError,
    WizardField, WizardStep,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid pipeline status: {0}")]
    InvalidStatus(String),
    #[error("invalid pipeline stage: {0}")]
    InvalidStage(String),
    #[error("invalid pipeline action: {0}")]
    InvalidAction(String),
    #[error("invalid campaign kind: {0}")]
    InvalidCampaignKind(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
