//! Display statistics computed over pipelines and contacts.
//!
//! Nothing here touches lead data beyond counting.

use serde::{Deserialize, Serialize};

use crate::contact::IcebreakerFlags;
use crate::pipeline::{Pipeline, PipelineStatus};

/// Icebreaker classification counts for one pipeline's contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IcebreakerStats {
    pub total: usize,
    pub network_post: usize,
    pub deep_search: usize,
    pub generic: usize,
    pub pending: usize,
}

impl IcebreakerStats {
    /// Counts each flag on its own. A contact with several flags set counts
    /// once per flag, and `pending` is whatever the flag counts leave of the
    /// total, floored at zero.
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = IcebreakerFlags>,
    {
        let mut stats = flags.into_iter().fold(Self::default(), |mut stats, f| {
            stats.total += 1;
            stats.network_post += usize::from(f.is_network_post == Some(true));
            stats.deep_search += usize::from(f.is_deep_search == Some(true));
            stats.generic += usize::from(f.is_generic == Some(true));
            stats
        });
        stats.pending = stats
            .total
            .saturating_sub(stats.network_post + stats.deep_search + stats.generic);
        stats
    }

    #[must_use]
    pub fn generated(&self) -> usize {
        self.total - self.pending
    }

    /// Share of `count` in the total, rounded half up. Zero when empty.
    #[must_use]
    pub fn percent(&self, count: usize) -> u8 {
        rounded_percent(count as u64, self.total as u64)
    }
}

fn rounded_percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part.saturating_mul(200) + whole) / (whole * 2);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// Pipeline counts per status, plus those still generating leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CampaignStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub error: usize,
    pub generating: usize,
}

impl CampaignStats {
    #[must_use]
    pub fn from_pipelines(pipelines: &[Pipeline]) -> Self {
        pipelines.iter().fold(Self::default(), |mut stats, p| {
            stats.total += 1;
            match p.status {
                PipelineStatus::Pending => stats.pending += 1,
                PipelineStatus::InProgress => stats.in_progress += 1,
                PipelineStatus::Completed => stats.completed += 1,
                PipelineStatus::Error => stats.error += 1,
            }
            if p.is_generating_leads() {
                stats.generating += 1;
            }
            stats
        })
    }
}

/// Lead counts summed across pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LeadTotals {
    pub target: i64,
    pub processed: i64,
    pub pending: i64,
}

impl LeadTotals {
    #[must_use]
    pub fn from_pipelines(pipelines: &[Pipeline]) -> Self {
        let (target, processed) = pipelines.iter().fold((0_i64, 0_i64), |(t, p), pipeline| {
            (
                t + i64::from(pipeline.target_lead_count.unwrap_or(0)),
                p + i64::from(pipeline.leads_processed.unwrap_or(0)),
            )
        });
        Self {
            target,
            processed,
            pending: (target - processed).max(0),
        }
    }
}

/// List filter: case-insensitive name search and optional status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PipelineFilter {
    pub search: Option<String>,
    pub status: Option<PipelineStatus>,
}

impl PipelineFilter {
    #[must_use]
    pub fn matches(&self, pipeline: &Pipeline) -> bool {
        let matches_search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .is_none_or(|s| pipeline.name.to_lowercase().contains(&s.to_lowercase()));
        let matches_status = self.status.is_none_or(|status| pipeline.status == status);
        matches_search && matches_status
    }

    #[must_use]
    pub fn apply<'a>(&self, pipelines: &'a [Pipeline]) -> Vec<&'a Pipeline> {
        pipelines.iter().filter(|p| self.matches(p)).collect()
    }
}
