//! Five-step pipeline creation wizard.
//!
//! Steps run Name → Kind → Campaign → Criteria → Summary. Network campaigns
//! have no cold-email campaign to pick, so step 3 is skipped in both
//! directions for them. Each forward move is gated by validation of the
//! step being left; errors are kept per field until the next attempt.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::criteria::{parse_criteria, target_lead_count, CriteriaError};
use crate::pipeline::{CampaignKind, NewPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Name,
    Kind,
    Campaign,
    Criteria,
    Summary,
}

impl WizardStep {
    pub const FIRST: Self = Self::Name;
    pub const LAST: Self = Self::Summary;

    /// 1-based position, as shown to the operator.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Name => 1,
            Self::Kind => 2,
            Self::Campaign => 3,
            Self::Criteria => 4,
            Self::Summary => 5,
        }
    }

    #[must_use]
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Name),
            2 => Some(Self::Kind),
            3 => Some(Self::Campaign),
            4 => Some(Self::Criteria),
            5 => Some(Self::Summary),
            _ => None,
        }
    }

    /// Transition table for `next`.
    #[must_use]
    pub fn next(self, kind: CampaignKind) -> Self {
        match (self, kind) {
            (Self::Name, _) => Self::Kind,
            (Self::Kind, CampaignKind::Network) => Self::Criteria,
            (Self::Kind, CampaignKind::Email) => Self::Campaign,
            (Self::Campaign, _) => Self::Criteria,
            (Self::Criteria | Self::Summary, _) => Self::Summary,
        }
    }

    /// Transition table for `prev`.
    #[must_use]
    pub fn prev(self, kind: CampaignKind) -> Self {
        match (self, kind) {
            (Self::Name | Self::Kind, _) => Self::Name,
            (Self::Campaign, _) => Self::Kind,
            (Self::Criteria, CampaignKind::Network) => Self::Kind,
            (Self::Criteria, CampaignKind::Email) => Self::Campaign,
            (Self::Summary, _) => Self::Criteria,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardField {
    Name,
    ExternalCampaignId,
    Criteria,
}

pub type FieldErrors = BTreeMap<WizardField, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("validation failed: {}", describe(.0))]
    Invalid(FieldErrors),
    #[error("pipelines can only be submitted from the summary step")]
    NotOnSummary,
}

impl WizardError {
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            Self::NotOnSummary => None,
        }
    }
}

fn describe(errors: &FieldErrors) -> String {
    errors
        .values()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum SubmitError<E> {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("failed to persist pipeline: {0}")]
    Persist(E),
}

/// Operator input collected across the steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WizardDraft {
    pub name: String,
    pub instruction: String,
    pub campaign_kind: CampaignKind,
    pub external_campaign_id: String,
    /// Raw criteria JSON as typed.
    pub criteria: String,
}

impl WizardDraft {
    /// Validation errors for the gate on `step`; empty when it passes.
    #[must_use]
    pub fn validate_step(&self, step: WizardStep) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            WizardStep::Name => {
                if self.name.trim().is_empty() {
                    errors.insert(WizardField::Name, "pipeline name is required".to_string());
                }
            }
            WizardStep::Campaign => {
                if self.campaign_kind.uses_external_campaign()
                    && self.external_campaign_id.trim().is_empty()
                {
                    errors.insert(
                        WizardField::ExternalCampaignId,
                        "select a cold-email campaign".to_string(),
                    );
                }
            }
            WizardStep::Criteria => {
                if let Err(e) = parse_criteria(&self.criteria, self.campaign_kind) {
                    errors.insert(WizardField::Criteria, e.to_string());
                }
            }
            WizardStep::Kind | WizardStep::Summary => {}
        }
        errors
    }

    /// Runs every gate and builds the row to insert.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Invalid`] with all failing fields.
    pub fn into_submission(self) -> Result<NewPipeline, WizardError> {
        let errors: FieldErrors = [WizardStep::Name, WizardStep::Campaign, WizardStep::Criteria]
            .into_iter()
            .flat_map(|step| self.validate_step(step))
            .collect();
        if !errors.is_empty() {
            return Err(WizardError::Invalid(errors));
        }

        let criteria = parse_criteria(&self.criteria, self.campaign_kind).map_err(criteria_error)?;
        let external_campaign_id = if self.campaign_kind.uses_external_campaign() {
            self.external_campaign_id.trim().to_string()
        } else {
            String::new()
        };

        Ok(NewPipeline {
            name: self.name.trim().to_string(),
            instruction: self.instruction,
            campaign_kind: self.campaign_kind,
            external_campaign_id,
            target_lead_count: target_lead_count(&criteria),
            criteria,
        })
    }
}

fn criteria_error(e: CriteriaError) -> WizardError {
    WizardError::Invalid(FieldErrors::from([(WizardField::Criteria, e.to_string())]))
}

/// Reminder of the messaging network's outreach caps, shown before a
/// network campaign leaves the criteria step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitNotice {
    pub daily_cap: u32,
    pub monthly_cap: u32,
}

impl RateLimitNotice {
    pub const NETWORK: Self = Self {
        daily_cap: 25,
        monthly_cap: 500,
    };

    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "the messaging network limits outreach to {} invitations per day and {} per month; \
             size the search criteria accordingly",
            self.daily_cap, self.monthly_cap
        )
    }
}

/// Outcome of a successful `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(WizardStep),
    /// The step is valid but the operator must acknowledge the notice;
    /// call [`Wizard::confirm`] to proceed or [`Wizard::cancel`] to stay.
    ConfirmRequired(RateLimitNotice),
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    draft: WizardDraft,
    errors: FieldErrors,
    awaiting_confirmation: bool,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: WizardStep::FIRST,
            draft: WizardDraft::default(),
            errors: FieldErrors::new(),
            awaiting_confirmation: false,
        }
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub fn draft(&self) -> &WizardDraft {
        &self.draft
    }

    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub fn awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.draft.instruction = instruction.into();
    }

    /// Switching to a network campaign drops any selected cold-email campaign.
    pub fn set_campaign_kind(&mut self, kind: CampaignKind) {
        self.draft.campaign_kind = kind;
        if !kind.uses_external_campaign() {
            self.draft.external_campaign_id.clear();
        }
    }

    pub fn select_campaign(&mut self, external_campaign_id: impl Into<String>) {
        self.draft.external_campaign_id = external_campaign_id.into();
    }

    pub fn set_criteria(&mut self, criteria: impl Into<String>) {
        self.draft.criteria = criteria.into();
    }

    /// Validates the current step and moves forward.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Invalid`] and stays on the step if the gate
    /// fails. The same errors are available from [`Wizard::errors`].
    pub fn next(&mut self) -> Result<Advance, WizardError> {
        self.errors = self.draft.validate_step(self.step);
        if !self.errors.is_empty() {
            return Err(WizardError::Invalid(self.errors.clone()));
        }

        if self.step == WizardStep::Criteria && self.draft.campaign_kind == CampaignKind::Network {
            self.awaiting_confirmation = true;
            return Ok(Advance::ConfirmRequired(RateLimitNotice::NETWORK));
        }

        self.step = self.step.next(self.draft.campaign_kind);
        Ok(Advance::Moved(self.step))
    }

    /// Acknowledges a pending notice and advances. No-op otherwise.
    pub fn confirm(&mut self) -> WizardStep {
        if self.awaiting_confirmation {
            self.awaiting_confirmation = false;
            self.step = self.step.next(self.draft.campaign_kind);
        }
        self.step
    }

    /// Dismisses a pending notice without moving.
    pub fn cancel(&mut self) -> WizardStep {
        self.awaiting_confirmation = false;
        self.step
    }

    pub fn prev(&mut self) -> WizardStep {
        self.awaiting_confirmation = false;
        self.step = self.step.prev(self.draft.campaign_kind);
        self.step
    }

    /// Builds the submission from the summary step.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::NotOnSummary`] before step 5, or
    /// [`WizardError::Invalid`] if any gate fails on re-validation.
    pub fn submission(&mut self) -> Result<NewPipeline, WizardError> {
        if self.step != WizardStep::Summary {
            return Err(WizardError::NotOnSummary);
        }
        match self.draft.clone().into_submission() {
            Ok(pipeline) => {
                self.errors.clear();
                Ok(pipeline)
            }
            Err(e) => {
                if let Some(errors) = e.field_errors() {
                    self.errors.clone_from(errors);
                }
                Err(e)
            }
        }
    }

    /// Submits through `persist` and resets on success. On failure the
    /// draft and step are kept so the operator can retry.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Wizard`] if validation fails, or
    /// [`SubmitError::Persist`] with the callback's error.
    pub async fn submit_with<F, Fut, T, E>(&mut self, persist: F) -> Result<T, SubmitError<E>>
    where
        F: FnOnce(NewPipeline) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let pipeline = self.submission()?;
        let saved = persist(pipeline).await.map_err(SubmitError::Persist)?;
        self.reset();
        Ok(saved)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
#[path = "wizard_test.rs"]
mod tests;
