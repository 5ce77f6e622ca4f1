pub mod client;
pub mod error;
pub mod payload;

pub use client::{WebhookClient, WebhookSink};
pub use error::WebhookError;
pub use payload::{has_required_fields, WebhookPayload, PROCESS_PIPELINE_ACTION};
