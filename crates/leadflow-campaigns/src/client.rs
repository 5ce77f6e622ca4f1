//! HTTP client for the cold-email platform's campaign directory.
//!
//! Only the listing endpoint is used: the dashboard needs campaign ids and
//! names to attach an email pipeline to an existing platform campaign.

use reqwest::{Client, Url};

use crate::error::CampaignsError;
use crate::types::{CampaignPage, CampaignSummary};

const PAGE_LIMIT: &str = "100";

/// Client for the campaign listing API.
///
/// The base URL comes from configuration, so tests can point it at a mock
/// server.
pub struct CampaignsClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl CampaignsClient {
    /// # Errors
    ///
    /// Returns [`CampaignsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CampaignsError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, CampaignsError> {
        let client = Client::builder()
            .user_agent("leadflow/0.1 (campaign-directory)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| CampaignsError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Lists up to 100 campaigns, reduced to id, name, and status.
    ///
    /// Only the first page is read; `next_starting_after` is ignored.
    ///
    /// # Errors
    ///
    /// - [`CampaignsError::Http`] on network failure.
    /// - [`CampaignsError::UnexpectedStatus`] on a non-2xx response, carrying
    ///   the status and body text.
    /// - [`CampaignsError::Deserialize`] if the body is not a campaign page.
    pub async fn list_campaigns(&self) -> Result<Vec<CampaignSummary>, CampaignsError> {
        let url = self.campaigns_url();
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "campaign listing failed");
            return Err(CampaignsError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let page: CampaignPage =
            serde_json::from_str(&body).map_err(|e| CampaignsError::Deserialize {
                context: url.path().to_string(),
                source: e,
            })?;

        tracing::debug!(count = page.items.len(), "campaigns fetched");
        Ok(page.items.into_iter().map(CampaignSummary::from).collect())
    }

    fn campaigns_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("api/v2/campaigns");
        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaigns_url_has_path_and_limit() {
        let client = CampaignsClient::with_base_url("k", "https://api.instantly.ai/")
            .expect("client construction should not fail");
        assert_eq!(
            client.campaigns_url().as_str(),
            "https://api.instantly.ai/api/v2/campaigns?limit=100"
        );
    }

    #[test]
    fn configured_default_needs_no_trailing_slash() {
        let client = CampaignsClient::with_base_url("k", "https://api.instantly.ai")
            .expect("client construction should not fail");
        assert_eq!(
            client.campaigns_url().as_str(),
            "https://api.instantly.ai/api/v2/campaigns?limit=100"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = CampaignsClient::with_base_url("k", "not a url");
        assert!(matches!(result, Err(CampaignsError::InvalidBaseUrl { .. })));
    }
}
