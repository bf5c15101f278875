// src/ingest/fetch.rs
//! Outbound HTTP for source adapters. Adapters only see the [`Fetch`] trait so
//! tests can serve fixtures instead of the network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; job-feed-bridge/0.1; +https://github.com/job-feed-bridge)";

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn text(&self, url: &str) -> Result<String>;
    async fn bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed fetcher with a per-call timeout. Non-2xx responses are errors.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("building source http client")?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status} for {url}");
        }
        Ok(resp)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn text(&self, url: &str) -> Result<String> {
        self.get(url)
            .await?
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }

    async fn bytes(&self, url: &str) -> Result<Vec<u8>> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        Ok(body.to_vec())
    }
}
