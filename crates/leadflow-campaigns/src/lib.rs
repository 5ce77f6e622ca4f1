pub mod client;
pub mod error;
pub mod types;

pub use client::CampaignsClient;
pub use error::CampaignsError;
pub use types::{ApiCampaign, CampaignPage, CampaignSummary};
