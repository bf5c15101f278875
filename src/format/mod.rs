// src/format/mod.rs
//! Formatter gateway: discovered item -> model prompt -> validated post.

pub mod ai_adapter;
pub mod prompt;
pub mod schema;

use serde::{Deserialize, Serialize};

use crate::format::ai_adapter::DynChatClient;
use crate::ingest::types::DiscoveredItem;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("no language-model credential configured")]
    MissingCredential,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("model endpoint returned HTTP {0}")]
    Status(u16),
    #[error("model returned an empty reply")]
    EmptyReply,
    #[error("model reply is not a JSON object: {0}")]
    MalformedReply(String),
    #[error("model reply is missing required field `{0}`")]
    MissingField(&'static str),
}

impl FormatError {
    /// Short label for metrics and run summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            FormatError::MissingCredential => "missing_credential",
            FormatError::Transport(_) => "transport",
            FormatError::Status(_) => "status",
            FormatError::EmptyReply => "empty_reply",
            FormatError::MalformedReply(_) => "malformed_reply",
            FormatError::MissingField(_) => "missing_field",
        }
    }
}

/// A structured post ready for the CMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPost {
    pub unique_id: String,
    pub title: String,
    pub content_html: String,
    pub source: String,
    pub source_link: String,
}

pub struct Formatter {
    client: DynChatClient,
    max_tokens: u32,
}

impl Formatter {
    pub fn new(client: DynChatClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_configured()
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// One model call per item; no retries. Every failure is logged here once.
    pub async fn format(&self, item: &DiscoveredItem) -> Result<FormattedPost, FormatError> {
        let key = item.uniqueness_key();
        if !self.client.is_configured() {
            tracing::debug!(target: "format", %key, "no credential, formatting skipped");
            return Err(FormatError::MissingCredential);
        }

        let req = prompt::build_request(item, self.max_tokens);
        let result = match self.client.complete(&req).await {
            Ok(reply) => schema::parse_reply(&reply, item),
            Err(e) => Err(e),
        };

        match &result {
            Ok(post) => {
                tracing::debug!(target: "format", %key, unique_id = %post.unique_id, "item formatted")
            }
            Err(e) => {
                tracing::warn!(target: "format", %key, provider = self.client.provider_name(), error = %e, "item dropped")
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ai_adapter::{ChatClient, ChatFuture, ChatRequest, DisabledClient};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        reply: Result<String, FormatError>,
        calls: AtomicUsize,
    }

    impl ChatClient for Fixed {
        fn complete<'a>(&'a self, _req: &'a ChatRequest) -> ChatFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = self.reply.clone();
            Box::pin(async move { out })
        }
        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn item() -> DiscoveredItem {
        DiscoveredItem {
            title: "Clerk".into(),
            url: "https://gov.test/clerk".into(),
            snippet: String::new(),
            pdf_text: None,
            published: None,
            source_name: "Gov".into(),
            source_id: "g".into(),
            discovered_from: "https://gov.test".into(),
        }
    }

    #[tokio::test]
    async fn skips_without_credential() {
        let f = Formatter::new(Arc::new(DisabledClient), 100);
        assert!(!f.is_enabled());
        assert_eq!(f.format(&item()).await, Err(FormatError::MissingCredential));
    }

    #[tokio::test]
    async fn transport_errors_pass_through_untouched() {
        let client = Arc::new(Fixed {
            reply: Err(FormatError::Status(503)),
            calls: AtomicUsize::new(0),
        });
        let f = Formatter::new(client.clone(), 100);
        assert_eq!(f.format(&item()).await, Err(FormatError::Status(503)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn valid_reply_becomes_post() {
        let client = Arc::new(Fixed {
            reply: Ok(r#"{"unique_id":"clerk-2026","title":"Clerk","content_html":"<p>x</p>"}"#.into()),
            calls: AtomicUsize::new(0),
        });
        let post = Formatter::new(client, 100).format(&item()).await.unwrap();
        assert_eq!(post.unique_id, "clerk-2026");
        assert_eq!(post.source, "Gov");
    }
}
