// tests/common/mod.rs
// Shared fakes: a fixture-serving fetcher and a scripted chat client.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use job_feed_bridge::format::ai_adapter::{ChatClient, ChatFuture, ChatRequest};
use job_feed_bridge::format::{FormatError, Formatter};
use job_feed_bridge::ingest::fetch::Fetch;
use job_feed_bridge::ingest::providers::Adapters;
use job_feed_bridge::store::RunStore;
use job_feed_bridge::{Pipeline, Source};

/// Serves canned bodies by URL; unknown URLs fail like a network error.
#[derive(Default)]
pub struct FixtureFetcher {
    bodies: HashMap<String, Vec<u8>>,
    delay: Option<Duration>,
    url_delays: HashMap<String, Duration>,
    pub hits: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay for one URL only; overrides the global delay.
    pub fn with_url_delay(mut self, url: &str, delay: Duration) -> Self {
        self.url_delays.insert(url.to_string(), delay);
        self
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    async fn serve(&self, url: &str) -> Result<Vec<u8>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.url_delays.get(url).copied().or(self.delay) {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {url}"))
    }
}

#[async_trait]
impl Fetch for FixtureFetcher {
    async fn text(&self, url: &str) -> Result<String> {
        Ok(String::from_utf8(self.serve(url).await?)?)
    }

    async fn bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.serve(url).await
    }
}

/// Replies with the first script entry whose needle occurs in the user prompt.
#[derive(Default)]
pub struct ScriptedChatClient {
    script: Vec<(String, String)>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, needle: &str, reply: &str) -> Self {
        self.script.push((needle.to_string(), reply.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn calls_mentioning(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

impl ChatClient for ScriptedChatClient {
    fn complete<'a>(&'a self, req: &'a ChatRequest) -> ChatFuture<'a> {
        self.prompts.lock().push(req.user.clone());
        let reply = self
            .script
            .iter()
            .find(|(needle, _)| req.user.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| FormatError::Transport("no scripted reply".into()));
        Box::pin(async move { reply })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn post_json(id: &str, title: &str) -> String {
    serde_json::json!({
        "unique_id": id,
        "title": title,
        "content_html": format!("<p>{title}</p><h2>Important Dates</h2>"),
        "source": "Fixture",
        "source_link": format!("https://posts.test/{id}"),
    })
    .to_string()
}

pub fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link)| {
            format!("<item><title>{title}</title><link>{link}</link><description>{title} notice</description></item>")
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Jobs</title>{body}</channel></rss>"#)
}

pub fn pipeline(
    sources: Vec<Source>,
    fetch: Arc<FixtureFetcher>,
    chat: Arc<dyn ChatClient>,
    concurrency: usize,
) -> Pipeline {
    Pipeline::new(
        Arc::new(sources),
        Adapters::new(fetch, 50),
        Formatter::new(chat, 800),
        Arc::new(RunStore::new()),
        concurrency,
    )
}
