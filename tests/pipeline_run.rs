// tests/pipeline_run.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{pipeline, post_json, rss, FixtureFetcher, ScriptedChatClient};
use job_feed_bridge::format::ai_adapter::DisabledClient;
use job_feed_bridge::pipeline::SourceStatus;
use job_feed_bridge::{Source, SourceKind, Trigger};

const FEED: &str = "https://feed.test/rss";
const A: &str = "https://feed.test/jobs/a";
const B: &str = "https://feed.test/jobs/b";
const C: &str = "https://files.test/c.pdf";

fn feed_source() -> Source {
    Source::new("feed", "Feed", SourceKind::Rss, FEED)
}

#[tokio::test]
async fn rss_and_pdf_with_one_malformed_reply_yield_two_posts() {
    let fetch = Arc::new(
        FixtureFetcher::new()
            .with(FEED, rss(&[("Clerk A", A), ("Clerk B", B)]))
            .with(C, b"%PDF-1.4 truncated".to_vec()),
    );
    let chat = Arc::new(
        ScriptedChatClient::new()
            .reply(A, &post_json("a", "Post A"))
            .reply(B, "Sorry, I can't help with that.")
            .reply(C, &post_json("c", "Post C")),
    );
    let sources = vec![
        feed_source(),
        Source::new("pdf", "Notice PDF", SourceKind::Pdf, C),
    ];
    let p = pipeline(sources, fetch, chat.clone(), 3);

    let report = p.run(Trigger::Http).await.expect("run completes");

    let ids: Vec<_> = report.jobs.iter().map(|j| j.unique_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(report.summary.discovered, 3);
    assert_eq!(report.summary.formatted, 2);
    assert_eq!(report.summary.failures.len(), 1);
    assert_eq!(report.summary.failures[0].key, B);
    assert_eq!(chat.calls(), 3);

    let registry = &p.store().registry;
    assert!(registry.contains(A));
    assert!(registry.contains(C));
    assert!(!registry.contains(B), "failed items are not registered");

    let cached = p.store().last_run.posts();
    assert_eq!(cached.len(), 2);
}

#[tokio::test]
async fn same_url_in_two_sources_is_formatted_once_and_never_again() {
    let other_feed = "https://mirror.test/rss";
    let fetch = Arc::new(
        FixtureFetcher::new()
            .with(FEED, rss(&[("Clerk A", A)]))
            .with(other_feed, rss(&[("Clerk A (mirror)", A)])),
    );
    let chat = Arc::new(ScriptedChatClient::new().reply(A, &post_json("a", "Post A")));
    let sources = vec![
        feed_source(),
        Source::new("mirror", "Mirror", SourceKind::Rss, other_feed),
    ];
    let p = pipeline(sources, fetch, chat.clone(), 2);

    let first = p.run(Trigger::Http).await.unwrap();
    assert_eq!(first.summary.discovered, 2);
    assert_eq!(first.summary.duplicates, 1);
    assert_eq!(first.jobs.len(), 1);
    assert_eq!(chat.calls_mentioning(A), 1);
    assert_eq!(chat.calls_mentioning("Clerk A (mirror)"), 0, "first occurrence wins");
    assert_eq!(p.store().registry.snapshot(), vec![A.to_string()]);

    let second = p.run(Trigger::Schedule).await.unwrap();
    assert!(second.jobs.is_empty());
    assert_eq!(second.summary.already_processed, 1);
    assert_eq!(chat.calls_mentioning(A), 1, "processed keys never reach the model again");
    assert!(p.store().last_run.posts().is_empty());
}

#[tokio::test]
async fn zero_sources_short_circuits() {
    let fetch = Arc::new(FixtureFetcher::new());
    let chat = Arc::new(ScriptedChatClient::new());
    let p = pipeline(Vec::new(), fetch.clone(), chat.clone(), 3);

    let report = p.run(Trigger::Http).await.unwrap();
    assert!(report.jobs.is_empty());
    assert_eq!(report.summary.discovered, 0);
    assert_eq!(chat.calls(), 0);
    assert_eq!(fetch.hits(), 0);
    let cached = p.store().last_run.get().expect("empty result still cached");
    assert!(cached.posts.is_empty());
}

#[tokio::test]
async fn failing_source_does_not_abort_healthy_ones() {
    let fetch = Arc::new(FixtureFetcher::new().with(FEED, rss(&[("Clerk A", A)])));
    let chat = Arc::new(ScriptedChatClient::new().reply(A, &post_json("a", "Post A")));
    let sources = vec![
        Source::new("down", "Down", SourceKind::Page, "https://down.test/"),
        Source::new("junk", "Junk", SourceKind::Api, "https://down.test/api"),
        feed_source(),
        Source::new("tg", "Telegram", SourceKind::Unsupported, "https://t.test"),
    ];
    let p = pipeline(sources, fetch, chat, 2);

    let report = p.run(Trigger::Http).await.unwrap();
    assert_eq!(report.jobs.len(), 1);

    let statuses: Vec<_> = report
        .summary
        .sources
        .iter()
        .map(|s| (s.id.as_str(), s.status.clone(), s.items))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("down", SourceStatus::Failed, 0),
            ("junk", SourceStatus::Failed, 0),
            ("feed", SourceStatus::Ok, 1),
            ("tg", SourceStatus::Ok, 0),
        ]
    );
    assert!(report.summary.sources[0].error.is_some());
}

#[tokio::test]
async fn missing_credential_skips_every_item_without_registering() {
    let fetch = Arc::new(FixtureFetcher::new().with(FEED, rss(&[("Clerk A", A), ("Clerk B", B)])));
    let p = pipeline(vec![feed_source()], fetch, Arc::new(DisabledClient), 3);

    let report = p.run(Trigger::Http).await.unwrap();
    assert!(report.jobs.is_empty());
    assert_eq!(report.summary.skipped, 2);
    assert!(report.summary.failures.is_empty());
    assert!(p.store().registry.is_empty());
}

#[tokio::test]
async fn results_follow_catalog_order_not_completion_order() {
    let slow = "https://slow.test/rss";
    let fetch = Arc::new(
        FixtureFetcher::new()
            .with(slow, rss(&[("Slow job", "https://slow.test/1")]))
            .with_url_delay(slow, Duration::from_millis(80))
            .with(FEED, rss(&[("Clerk A", A)])),
    );
    let chat = Arc::new(
        ScriptedChatClient::new()
            .reply("https://slow.test/1", &post_json("slow", "Slow"))
            .reply(A, &post_json("a", "Post A")),
    );
    let sources = vec![
        Source::new("slow", "Slow", SourceKind::Rss, slow),
        feed_source(),
    ];
    let p = pipeline(sources, fetch, chat, 2);

    let report = p.run(Trigger::Http).await.unwrap();
    let ids: Vec<_> = report.jobs.iter().map(|j| j.unique_id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "a"]);
    let sources: Vec<_> = report.summary.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sources, vec!["slow", "feed"]);
}

#[tokio::test]
async fn fan_out_respects_the_concurrency_limit() {
    let mut fetch = FixtureFetcher::new().with_delay(Duration::from_millis(20));
    let mut sources = Vec::new();
    for i in 0..8 {
        let url = format!("https://feed{i}.test/rss");
        fetch = fetch.with(&url, rss(&[]));
        sources.push(Source::new(&format!("f{i}"), "F", SourceKind::Rss, &url));
    }
    let fetch = Arc::new(fetch);
    let p = pipeline(sources, fetch.clone(), Arc::new(ScriptedChatClient::new()), 3);

    p.run(Trigger::Http).await.unwrap();
    assert_eq!(fetch.hits(), 8);
    let peak = fetch.max_in_flight.load(std::sync::atomic::Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight fetches {peak} exceeded the limit");
    assert!(peak >= 2, "fetches should overlap");
}

#[tokio::test]
async fn overlapping_runs_never_format_the_same_key_twice() {
    let fetch = Arc::new(
        FixtureFetcher::new()
            .with(FEED, rss(&[("Clerk A", A), ("Clerk B", B)]))
            .with_delay(Duration::from_millis(10)),
    );
    let chat = Arc::new(
        ScriptedChatClient::new()
            .reply(A, &post_json("a", "Post A"))
            .reply(B, &post_json("b", "Post B")),
    );
    let p = Arc::new(pipeline(vec![feed_source()], fetch, chat.clone(), 4));

    let (r1, r2) = tokio::join!(p.run(Trigger::Http), p.run(Trigger::Schedule));
    let total = r1.unwrap().jobs.len() + r2.unwrap().jobs.len();
    assert_eq!(total, 2);
    assert_eq!(chat.calls_mentioning(A), 1);
    assert_eq!(chat.calls_mentioning(B), 1);
    assert_eq!(p.store().registry.len(), 2);
}
