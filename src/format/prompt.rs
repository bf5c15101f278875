// src/format/prompt.rs
use serde::Serialize;

use crate::format::ai_adapter::ChatRequest;
use crate::ingest::types::DiscoveredItem;

pub const SYSTEM_PROMPT: &str = "You are an editor for a job-notification website. \
You turn raw recruitment notices into structured blog posts. \
Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = r#"Rewrite the job notice below into a post.
Return a JSON object with exactly these fields:
  "unique_id"    - a short stable identifier for this notice (e.g. organisation + post + year, slugified)
  "title"        - a clear post title
  "content_html" - the post body as HTML
  "source"       - the name of the publishing source
  "source_link"  - the URL of the original notice
When the information is available, content_html must contain, in this order:
  an introduction paragraph,
  an "Important Dates" table,
  a "Vacancy Details" table,
  a "How to Apply" section,
  an "Important Links" section.
Do not invent dates, numbers or links that are not present in the notice.

Notice (JSON):
"#;

/// The record embedded in the prompt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord<'a> {
    pub title: &'a str,
    pub snippet: &'a str,
    pub url: &'a str,
    pub pdf_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<&'a str>,
    pub source_name: &'a str,
    pub discovered_from: &'a str,
}

impl<'a> From<&'a DiscoveredItem> for RawRecord<'a> {
    fn from(item: &'a DiscoveredItem) -> Self {
        Self {
            title: item.title.trim(),
            snippet: item.snippet.trim(),
            url: item.url.trim(),
            pdf_text: item.pdf_text.as_deref(),
            published: item.published.as_deref(),
            source_name: &item.source_name,
            discovered_from: &item.discovered_from,
        }
    }
}

pub fn build_request(item: &DiscoveredItem, max_tokens: u32) -> ChatRequest {
    let record = RawRecord::from(item);
    // Serializing borrowed strings cannot fail.
    let json = serde_json::to_string_pretty(&record).unwrap_or_default();
    ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: format!("{INSTRUCTIONS}{json}"),
        temperature: 0.0,
        max_tokens,
    }
}
