// src/format/schema.rs
//! Parse-or-reject validation of model replies.

use serde::Deserialize;
use serde_json::Value;

use crate::format::{FormatError, FormattedPost};
use crate::ingest::types::DiscoveredItem;

#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    unique_id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content_html: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    source_link: Option<String>,
}

/// Models sometimes wrap JSON in a Markdown fence even when told not to.
fn strip_code_fence(reply: &str) -> &str {
    let t = reply.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    // Language tag, in any case (`json`, `JSON`, ...).
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, FormatError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(FormatError::MissingField(field))
}

/// Number ids are accepted and stringified.
fn unique_id_string(v: Value) -> Result<String, FormatError> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if s.is_empty() {
        return Err(FormatError::MissingField("unique_id"));
    }
    Ok(s)
}

pub fn parse_reply(reply: &str, item: &DiscoveredItem) -> Result<FormattedPost, FormatError> {
    let body = strip_code_fence(reply);
    let value: Value =
        serde_json::from_str(body).map_err(|e| FormatError::MalformedReply(e.to_string()))?;
    if !value.is_object() {
        return Err(FormatError::MalformedReply(
            "expected a JSON object".to_string(),
        ));
    }
    let parsed: ModelReply =
        serde_json::from_value(value).map_err(|e| FormatError::MalformedReply(e.to_string()))?;

    let unique_id = unique_id_string(parsed.unique_id)?;
    let title = required(parsed.title, "title")?;
    let content_html = required(parsed.content_html, "content_html")?;

    let source = parsed
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| item.source_name.clone());
    let source_link = parsed
        .source_link
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| item.url.clone());

    Ok(FormattedPost {
        unique_id,
        title,
        content_html,
        source,
        source_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn valid_reply_with_numeric_id_and_defaults() {
        let post = parse_reply(
            r#"{"unique_id": 4211, "title": "Clerk 2026", "content_html": "<p>x</p>"}"#,
            &item(),
        )
        .unwrap();
        assert_eq!(post.unique_id, "4211");
        assert_eq!(post.source, "Gov");
        assert_eq!(post.source_link, "https://gov.test/clerk");
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let reply = "```json\n{\"unique_id\":\"a\",\"title\":\"t\",\"content_html\":\"<p>c</p>\",\"source\":\"S\",\"source_link\":\"https://l\"}\n```";
        let post = parse_reply(reply, &item()).unwrap();
        assert_eq!(post.source, "S");
        assert_eq!(post.source_link, "https://l");

        let upper = "```JSON\n{\"unique_id\":\"b\",\"title\":\"t\",\"content_html\":\"<p>c</p>\"}\n```";
        assert_eq!(parse_reply(upper, &item()).unwrap().unique_id, "b");
    }

    #[test]
    fn positional_array_is_not_a_post() {
        let err = parse_reply(r#"["clerk-1","Clerk","<p>body</p>"]"#, &item()).unwrap_err();
        assert!(matches!(err, FormatError::MalformedReply(_)));
        assert!(matches!(
            parse_reply(r#""just a string""#, &item()),
            Err(FormatError::MalformedReply(_))
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_reply("Sure! Here is your post.", &item()).unwrap_err();
        assert!(matches!(err, FormatError::MalformedReply(_)));
        assert!(matches!(
            parse_reply("[1,2]", &item()),
            Err(FormatError::MalformedReply(_))
        ));
    }

    #[test]
    fn missing_or_blank_required_fields_are_rejected() {
        let err = parse_reply(r#"{"title":"t","content_html":"c"}"#, &item()).unwrap_err();
        assert!(matches!(err, FormatError::MissingField("unique_id")));
        let err = parse_reply(r#"{"unique_id":"a","title":"  ","content_html":"c"}"#, &item())
            .unwrap_err();
        assert!(matches!(err, FormatError::MissingField("title")));
        let err = parse_reply(r#"{"unique_id":"a","title":"t"}"#, &item()).unwrap_err();
        assert!(matches!(err, FormatError::MissingField("content_html")));
    }
}
