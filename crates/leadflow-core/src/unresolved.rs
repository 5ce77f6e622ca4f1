use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Start of the quoted original message in an HTML reply: a Gmail quote
/// container, a blockquote, or an "On ... wrote:" attribution line.
static THREAD_QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div\b[^>]*class\s*=\s*["'][^"']*\bgmail_quote\b|<blockquote\b|\bOn\s[^<>\n]{1,200}?\bwrote:"#,
    )
    .expect("valid thread quote regex")
});

/// A prospect reply the external classifier could not categorize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedLead {
    pub id: i64,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub reply_source: Option<String>,
    pub reply_html: Option<String>,
    pub profile_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyChannel {
    Email,
    Network,
}

impl ReplyChannel {
    /// The classifier writes exactly `"LinkedIn"` for network replies;
    /// anything else, including a missing source, is treated as email.
    #[must_use]
    pub fn detect(source: Option<&str>) -> Self {
        match source {
            Some("LinkedIn") => Self::Network,
            _ => Self::Email,
        }
    }
}

impl UnresolvedLead {
    #[must_use]
    pub fn channel(&self) -> ReplyChannel {
        ReplyChannel::detect(self.reply_source.as_deref())
    }

    /// The reply body and the quoted thread, if any.
    #[must_use]
    pub fn reply_parts(&self) -> (&str, Option<&str>) {
        split_thread_quote(self.reply_html.as_deref().unwrap_or_default())
    }
}

/// Splits an HTML reply at the first thread quote marker.
///
/// Returns the new content and the quoted portion (starting at the marker).
/// When no marker is found the whole body is returned with `None`.
#[must_use]
pub fn split_thread_quote(html: &str) -> (&str, Option<&str>) {
    match THREAD_QUOTE_RE.find(html) {
        Some(m) => (&html[..m.start()], Some(&html[m.start()..])),
        None => (html, None),
    }
}
