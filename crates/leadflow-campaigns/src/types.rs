use serde::{Deserialize, Serialize};

/// A campaign as returned by `GET /api/v2/campaigns`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCampaign {
    pub id: String,
    pub name: String,
    pub status: i64,
    #[serde(default)]
    pub timestamp_created: Option<String>,
    #[serde(default)]
    pub timestamp_updated: Option<String>,
}

/// One page of the campaign listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignPage {
    #[serde(default)]
    pub items: Vec<ApiCampaign>,
    #[serde(default)]
    pub next_starting_after: Option<String>,
}

/// What the dashboard needs to pick a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    pub status: i64,
}

impl CampaignSummary {
    /// Status code 1 is the platform's "active".
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == 1
    }
}

impl From<ApiCampaign> for CampaignSummary {
    fn from(campaign: ApiCampaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            status: campaign.status,
        }
    }
}
