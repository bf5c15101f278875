//! Language-model adapter: chat-completion client abstraction + OpenAI-compatible provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::format::FormatError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One chat-completion call: system + user message, deterministic sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FormatError>> + Send + 'a>>;

/// Trait object used by the formatter (and swapped for fakes in tests).
pub trait ChatClient: Send + Sync {
    /// Returns the primary text content of the reply.
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ChatFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
    /// `false` when no credential is configured; callers skip without calling.
    fn is_configured(&self) -> bool {
        true
    }
}

pub type DynChatClient = Arc<dyn ChatClient>;

/// Factory: OpenAI-compatible client when a key is present, otherwise the disabled client.
pub fn build_chat_client(config: &AiConfig) -> anyhow::Result<DynChatClient> {
    if !config.has_credential() {
        return Ok(Arc::new(DisabledClient));
    }
    Ok(Arc::new(OpenAiClient::new(config)?))
}

// ------------------------------------------------------------
// Concrete clients
// ------------------------------------------------------------

/// Chat Completions API (`POST {base}/chat/completions`).
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("job-feed-bridge/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.completions_url(),
        })
    }

    async fn complete_impl(&self, req: &ChatRequest) -> Result<String, FormatError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FormatError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FormatError::Status(status.as_u16()));
        }
        let parsed: Resp = resp
            .json()
            .await
            .map_err(|e| FormatError::Transport(format!("decoding completion: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(FormatError::EmptyReply)
    }
}

impl ChatClient for OpenAiClient {
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(self.complete_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Used when no credential is configured.
pub struct DisabledClient;

impl ChatClient for DisabledClient {
    fn complete<'a>(&'a self, _req: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(async { Err(FormatError::MissingCredential) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
    fn is_configured(&self) -> bool {
        false
    }
}
