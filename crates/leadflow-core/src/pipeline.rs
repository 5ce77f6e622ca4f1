//! Pipeline (prospecting campaign) records and their lifecycle enumerations.
//!
//! Status and stage are closed, ordered enumerations: both only move forward
//! except for the launch rollback, which resets a pipeline to its creation
//! state. The ordering derived on each enum follows declaration order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    CriteriaSaved,
    LeadsGenerating,
    LeadsGenerated,
    DataEnriched,
    IcebreakersReady,
    EmailsSent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    LaunchPrompt,
    Launched,
    CompletedPrompt,
}

/// Outreach channel of a campaign.
///
/// Serialized as `"email"` / `"linkedin"`, the values the workflow engine
/// expects in `type_de_campagne`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CampaignKind {
    #[default]
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "linkedin")]
    Network,
}

impl PipelineStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl PipelineStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CriteriaSaved => "criteria_saved",
            Self::LeadsGenerating => "leads_generating",
            Self::LeadsGenerated => "leads_generated",
            Self::DataEnriched => "data_enriched",
            Self::IcebreakersReady => "icebreakers_ready",
            Self::EmailsSent => "emails_sent",
        }
    }
}

impl PipelineAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LaunchPrompt => "launch_prompt",
            Self::Launched => "launched",
            Self::CompletedPrompt => "completed_prompt",
        }
    }
}

impl CampaignKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Network => "linkedin",
        }
    }

    /// Only email campaigns are attached to a cold-email platform campaign.
    #[must_use]
    pub fn uses_external_campaign(self) -> bool {
        matches!(self, Self::Email)
    }
}

impl FromStr for PipelineStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl FromStr for PipelineStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "criteria_saved" => Ok(Self::CriteriaSaved),
            "leads_generating" => Ok(Self::LeadsGenerating),
            "leads_generated" => Ok(Self::LeadsGenerated),
            "data_enriched" => Ok(Self::DataEnriched),
            "icebreakers_ready" => Ok(Self::IcebreakersReady),
            "emails_sent" => Ok(Self::EmailsSent),
            other => Err(CoreError::InvalidStage(other.to_string())),
        }
    }
}

impl FromStr for PipelineAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "launch_prompt" => Ok(Self::LaunchPrompt),
            "launched" => Ok(Self::Launched),
            "completed_prompt" => Ok(Self::CompletedPrompt),
            other => Err(CoreError::InvalidAction(other.to_string())),
        }
    }
}

impl FromStr for CampaignKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "linkedin" => Ok(Self::Network),
            other => Err(CoreError::InvalidCampaignKind(other.to_string())),
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prospecting campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    /// Free-text instruction forwarded to the workflow engine.
    pub instruction: String,
    pub campaign_kind: CampaignKind,
    /// Cold-email platform campaign id; empty for network campaigns.
    pub external_campaign_id: String,
    /// Search criteria, serialized JSON.
    pub criteria: String,
    pub status: PipelineStatus,
    pub stage: PipelineStage,
    pub action: PipelineAction,
    pub target_lead_count: Option<i32>,
    pub leads_processed: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    /// Returns `true` while the external process is still producing leads for
    /// this pipeline: either lead generation is running, or leads were
    /// generated but fewer than the target have been processed so far.
    #[must_use]
    pub fn is_generating_leads(&self) -> bool {
        if self.status != PipelineStatus::InProgress {
            return false;
        }

        match self.stage {
            PipelineStage::LeadsGenerating => true,
            PipelineStage::LeadsGenerated => match (self.target_lead_count, self.leads_processed) {
                (Some(target), Some(processed)) if target != 0 => processed < target,
                _ => false,
            },
            _ => false,
        }
    }

    /// Icebreakers are ready but the status was never promoted.
    #[must_use]
    pub fn needs_completion_promotion(&self) -> bool {
        self.progress().needs_completion_promotion()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == PipelineStatus::Completed && self.stage == PipelineStage::IcebreakersReady
    }

    #[must_use]
    pub fn progress(&self) -> PipelineProgress {
        PipelineProgress {
            status: self.status,
            stage: self.stage,
        }
    }

    /// Lead processing progress, when a target is tracked.
    #[must_use]
    pub fn lead_progress(&self) -> Option<LeadProgress> {
        let target = self.target_lead_count?;
        Some(LeadProgress::new(target, self.leads_processed.unwrap_or(0)))
    }

    /// Parses the stored criteria back into structured data.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the stored text is not valid JSON.
    pub fn parsed_criteria(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.criteria)
    }
}

/// Status and stage of a pipeline, fetched without the rest of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub status: PipelineStatus,
    pub stage: PipelineStage,
}

impl PipelineProgress {
    #[must_use]
    pub fn needs_completion_promotion(&self) -> bool {
        self.stage == PipelineStage::IcebreakersReady && self.status != PipelineStatus::Completed
    }
}

/// A validated pipeline ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    pub instruction: String,
    pub campaign_kind: CampaignKind,
    pub external_campaign_id: String,
    pub criteria: serde_json::Value,
    pub target_lead_count: Option<i32>,
}

impl NewPipeline {
    /// Serialized criteria as stored in the `criteria` column.
    #[must_use]
    pub fn criteria_text(&self) -> String {
        self.criteria.to_string()
    }
}

/// A coordinated write of the three lifecycle fields.
///
/// `stage: None` leaves the stored stage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleUpdate {
    pub status: PipelineStatus,
    pub stage: Option<PipelineStage>,
    pub action: PipelineAction,
}

impl LifecycleUpdate {
    /// Written optimistically when a campaign is launched.
    pub const LAUNCHED: Self = Self {
        status: PipelineStatus::InProgress,
        stage: Some(PipelineStage::LeadsGenerating),
        action: PipelineAction::Launched,
    };

    /// Restores the creation state after a failed launch.
    pub const ROLLBACK: Self = Self {
        status: PipelineStatus::Pending,
        stage: Some(PipelineStage::CriteriaSaved),
        action: PipelineAction::LaunchPrompt,
    };

    /// Promotion applied once icebreakers are ready.
    pub const COMPLETED: Self = Self {
        status: PipelineStatus::Completed,
        stage: None,
        action: PipelineAction::CompletedPrompt,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadProgress {
    pub target: i32,
    pub processed: i32,
}

impl LeadProgress {
    #[must_use]
    pub fn new(target: i32, processed: i32) -> Self {
        Self { target, processed }
    }

    #[must_use]
    pub fn remaining(&self) -> i32 {
        (self.target - self.processed).max(0)
    }

    /// Rounded percentage, capped at 100. Zero when no target is set.
    // clamped to 0..=100 before the cast
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        if self.target <= 0 {
            return 0;
        }
        let pct = (f64::from(self.processed) / f64::from(self.target) * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.target > 0 && self.processed >= self.target
    }
}

/// Polling entry condition over a whole list: at least one pipeline is still
/// generating leads.
#[must_use]
pub fn should_poll(pipelines: &[Pipeline]) -> bool {
    pipelines.iter().any(Pipeline::is_generating_leads)
}

/// Pipelines that became ready between two snapshots.
///
/// A pipeline qualifies only if it was present in `previous` with a status
/// other than `Completed` and is now `Completed` with icebreakers ready.
/// Pipelines absent from `previous` never qualify, so repeated comparisons of
/// unchanged snapshots report nothing.
#[must_use]
pub fn newly_completed<'a>(previous: &[Pipeline], current: &'a [Pipeline]) -> Vec<&'a Pipeline> {
    current
        .iter()
        .filter(|pipeline| pipeline.is_ready())
        .filter(|pipeline| {
            previous
                .iter()
                .find(|prev| prev.id == pipeline.id)
                .is_some_and(|prev| prev.status != PipelineStatus::Completed)
        })
        .collect()
}
