use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lead extracted for a pipeline by the external enrichment process.
///
/// Contacts are never written by this application; they arrive through the
/// backend and are only read, counted, and displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub email_status: Option<String>,
    pub phone: Option<String>,
    pub profile_url: Option<String>,
    pub position: Option<String>,
    pub seniority: Option<String>,
    pub functional: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub org_name: Option<String>,
    pub org_industry: Option<String>,
    pub org_size: Option<String>,
    pub org_website: Option<String>,
    pub org_profile_url: Option<String>,
    pub org_description: Option<String>,
    pub org_city: Option<String>,
    pub org_country: Option<String>,
    pub lead_info: Option<String>,
    pub icebreaker: Option<String>,
    pub is_network_post: Option<bool>,
    pub is_deep_search: Option<bool>,
    pub is_generic: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    #[must_use]
    pub fn flags(&self) -> IcebreakerFlags {
        IcebreakerFlags {
            is_network_post: self.is_network_post,
            is_deep_search: self.is_deep_search,
            is_generic: self.is_generic,
        }
    }

    /// Best display name: the full name, else first + last.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = self.full_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return Some(full.to_string());
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// The three classification flags of a contact's icebreaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IcebreakerFlags {
    pub is_network_post: Option<bool>,
    pub is_deep_search: Option<bool>,
    pub is_generic: Option<bool>,
}

/// Which source the icebreaker was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IcebreakerKind {
    NetworkPost,
    DeepSearch,
    Generic,
    Pending,
}

impl IcebreakerFlags {
    /// Classifies the icebreaker. The flags are expected to be mutually
    /// exclusive; if several are set, the first in priority order wins.
    #[must_use]
    pub fn kind(&self) -> IcebreakerKind {
        if self.is_network_post == Some(true) {
            IcebreakerKind::NetworkPost
        } else if self.is_deep_search == Some(true) {
            IcebreakerKind::DeepSearch
        } else if self.is_generic == Some(true) {
            IcebreakerKind::Generic
        } else {
            IcebreakerKind::Pending
        }
    }
}
