// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Source;

pub const ENV_PATH: &str = "SOURCES_PATH";

/// Load the sources catalog from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Resolve the catalog path: explicit > $SOURCES_PATH > config/sources.json > config/sources.toml.
pub fn resolve_sources_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(ENV_PATH) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    ["config/sources.json", "config/sources.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Missing or unparseable catalog is treated as an empty source list.
pub fn load_sources_or_empty(explicit: Option<&Path>) -> Vec<Source> {
    let Some(path) = resolve_sources_path(explicit) else {
        tracing::warn!(target: "ingest", "no sources catalog found; running with zero sources");
        return Vec::new();
    };
    match load_sources_from(&path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, path = %path.display(), "sources catalog unusable; running with zero sources");
            Vec::new()
        }
    }
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    if hint_ext == "toml" {
        return parse_toml(s);
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if let Ok(v) = parse_toml(s) {
        return Ok(v);
    }
    Err(anyhow!("unsupported sources format"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonCatalog {
    Wrapped { sources: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let entries = match serde_json::from_str::<JsonCatalog>(s)? {
        JsonCatalog::Wrapped { sources } | JsonCatalog::Bare(sources) => sources,
    };
    let sources = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, v)| keep_valid(idx, serde_json::from_value::<Source>(v)))
        .collect();
    Ok(clean_list(sources))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(Deserialize)]
    struct TomlCatalog {
        #[serde(default)]
        sources: Vec<toml::Value>,
    }
    let v: TomlCatalog = toml::from_str(s)?;
    let sources = v
        .sources
        .into_iter()
        .enumerate()
        .filter_map(|(idx, v)| keep_valid(idx, v.try_into::<Source>()))
        .collect();
    Ok(clean_list(sources))
}

/// A malformed entry is skipped on its own; the rest of the catalog stays usable.
fn keep_valid<E: std::fmt::Display>(idx: usize, entry: Result<Source, E>) -> Option<Source> {
    match entry {
        Ok(src) => Some(src),
        Err(e) => {
            tracing::warn!(target: "ingest", position = idx, error = %e, "invalid source entry skipped");
            None
        }
    }
}

/// Trim fields, drop entries without a URL, fill a missing id from position.
fn clean_list(items: Vec<Source>) -> Vec<Source> {
    let mut out = Vec::with_capacity(items.len());
    for (idx, mut src) in items.into_iter().enumerate() {
        src.url = src.url.trim().to_string();
        src.id = src.id.trim().to_string();
        src.name = src.name.trim().to_string();
        if src.url.is_empty() {
            tracing::warn!(target: "ingest", position = idx, id = %src.id, "source without url dropped");
            continue;
        }
        if src.id.is_empty() {
            src.id = format!("source-{}", idx + 1);
        }
        out.push(src);
    }
    out
}
