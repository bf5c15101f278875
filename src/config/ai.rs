// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};

use super::{env_opt, env_parse};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_max_tokens() -> u32 {
    1800
}
fn default_timeout_secs() -> u64 {
    30
}

/// Language-model settings. An empty `api_key` means formatting is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("OPENAI_API_KEY").unwrap_or_default(),
            model: env_opt("OPENAI_MODEL").unwrap_or_else(default_model),
            base_url: env_opt("OPENAI_BASE_URL").unwrap_or_else(default_base_url),
            max_tokens: env_parse("LLM_MAX_TOKENS", default_max_tokens()).max(1),
            timeout_secs: env_parse("LLM_TIMEOUT_SECS", default_timeout_secs()).max(1),
        }
    }

    /// `AI_CONFIG_PATH` wins when set; otherwise plain env vars.
    pub fn load() -> anyhow::Result<Self> {
        match env_opt("AI_CONFIG_PATH") {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::from_env()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        // "ENV" means: read the key from OPENAI_API_KEY
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?;
        }
        cfg.api_key = cfg.api_key.trim().to_string();
        cfg.base_url = cfg.base_url.trim_end_matches('/').to_string();
        if cfg.max_tokens == 0 {
            cfg.max_tokens = default_max_tokens();
        }

        Ok(cfg)
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
