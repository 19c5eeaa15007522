// tests/pipeline_e2e.rs
// Full run_once passes against in-memory collaborators.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use feed_crossposter::checkpoint::CheckpointStore;
use feed_crossposter::ingest::types::FeedSource;
use feed_crossposter::notify::{Channel, OutboundPayload, WebhookSender};
use feed_crossposter::run::{run_once, RunError};

const FEED_XML: &str = include_str!("fixtures/feed.xml");

// Epoch ms of the fixture's pubDates.
const TS_POST_1: i64 = 1_751_284_800_000;
const TS_POST_2: i64 = 1_751_371_200_000;
const TS_POST_3: i64 = 1_751_457_600_000;

struct FixtureSource(String);

#[async_trait]
impl FeedSource for FixtureSource {
    async fn fetch_document(&self) -> Result<String> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "fixture"
    }
}

struct UnreachableSource;

#[async_trait]
impl FeedSource for UnreachableSource {
    async fn fetch_document(&self) -> Result<String> {
        bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "unreachable"
    }
}

struct MemStore {
    value: Mutex<Option<i64>>,
    fail_put: bool,
}

impl MemStore {
    fn new(value: Option<i64>) -> Self {
        Self {
            value: Mutex::new(value),
            fail_put: false,
        }
    }

    fn failing_put(value: Option<i64>) -> Self {
        Self {
            value: Mutex::new(value),
            fail_put: true,
        }
    }

    fn current(&self) -> Option<i64> {
        *self.value.lock().unwrap()
    }
}

#[async_trait]
impl CheckpointStore for MemStore {
    async fn get(&self) -> Result<Option<i64>> {
        Ok(self.current())
    }
    async fn put(&self, value: i64) -> Result<()> {
        if self.fail_put {
            bail!("store unavailable");
        }
        *self.value.lock().unwrap() = Some(value);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OutboundPayload>>,
    reject_containing: Option<String>,
}

impl RecordingSender {
    fn rejecting(needle: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_containing: Some(needle.to_string()),
        }
    }

    fn sent(&self) -> Vec<OutboundPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookSender for RecordingSender {
    async fn send(&self, payload: &OutboundPayload) -> Result<()> {
        if let Some(needle) = &self.reject_containing {
            if payload.primary_text.contains(needle) {
                bail!("rejected by test sender");
            }
        }
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

#[tokio::test]
async fn fresh_run_posts_new_items_and_commits() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::new(None);
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    // post-2 is tag-excluded; the other two go out oldest-first.
    assert_eq!(report.considered, 3);
    assert_eq!(report.selected, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert!(report.checkpoint_written);
    assert_eq!(report.checkpoint_after, Some(TS_POST_3));
    assert_eq!(store.current(), Some(TS_POST_3));

    let sent = sender.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].primary_text.contains("First post body"));
    assert!(sent[0].primary_text.ends_with("https://blog.example.test/1"));
    assert_eq!(sent[0].channel, Channel::Default);
    assert!(sent[1].primary_text.contains("Third post body"));
    assert_eq!(sent[1].channel, Channel::WithMedia);
    assert_eq!(
        sent[1].media_url.as_deref(),
        Some("https://blog.example.test/img/3.jpg")
    );
}

#[tokio::test]
async fn checkpoint_hides_already_processed_items() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::new(Some(TS_POST_2));
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    assert_eq!(report.selected, 1);
    assert_eq!(store.current(), Some(TS_POST_3));

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].primary_text.contains("Third post body"));
}

#[tokio::test]
async fn excluded_item_advances_checkpoint_without_posting() {
    let source = FixtureSource(FEED_XML.to_string());
    // Everything except the tag-excluded post-2 is already processed.
    let store = MemStore::new(Some(TS_POST_1));
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    assert_eq!(report.selected, 1); // post-3 only
    assert_eq!(report.checkpoint_after, Some(TS_POST_3));
    assert!(sender
        .sent()
        .iter()
        .all(|p| !p.primary_text.contains("Second post body")));
}

#[tokio::test]
async fn dispatch_failure_degrades_but_still_commits() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::new(None);
    let sender = Arc::new(RecordingSender::rejecting("First post body"));

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    assert_eq!(report.selected, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    // The checkpoint tracks publish time seen, not delivery success.
    assert!(report.checkpoint_written);
    assert_eq!(store.current(), Some(TS_POST_3));
}

#[tokio::test]
async fn fetch_failure_aborts_without_checkpoint_write() {
    let store = MemStore::new(Some(TS_POST_1));
    let sender = Arc::new(RecordingSender::default());

    let err = run_once(&UnreachableSource, &store, sender.clone(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Fetch(_)));
    assert_eq!(store.current(), Some(TS_POST_1));
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn malformed_feed_is_a_parse_error() {
    let source = FixtureSource("<rss><channel><item></rss>".to_string());
    let store = MemStore::new(None);
    let sender = Arc::new(RecordingSender::default());

    let err = run_once(&source, &store, sender, 10).await.unwrap_err();
    assert!(matches!(err, RunError::Parse(_)));
    assert_eq!(store.current(), None);
}

#[tokio::test]
async fn checkpoint_write_failure_is_reported_not_fatal() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::failing_put(None);
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert!(!report.checkpoint_written);
    assert_eq!(report.checkpoint_after, Some(TS_POST_3));
    // Next run will reprocess the same batch.
    assert_eq!(store.current(), None);
}

#[tokio::test]
async fn nothing_new_skips_the_commit() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::failing_put(Some(TS_POST_3));
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();

    assert_eq!(report.selected, 0);
    assert!(!report.checkpoint_written);
    assert_eq!(report.checkpoint_after, Some(TS_POST_3));
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn max_items_bounds_the_run() {
    let source = FixtureSource(FEED_XML.to_string());
    let store = MemStore::new(None);
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 1)
        .await
        .unwrap();

    assert_eq!(report.considered, 1);
    assert_eq!(report.selected, 1);
    assert_eq!(store.current(), Some(TS_POST_3));
    assert_eq!(sender.sent().len(), 1);
}

#[tokio::test]
async fn long_item_goes_out_in_order_as_multiple_segments() {
    let body = "x".repeat(300);
    let xml = format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <guid>long</guid>
    <link>https://blog.example.test/long</link>
    <pubDate>Wed, 02 Jul 2025 12:00:00 +0000</pubDate>
    <description>{body}</description>
  </item>
</channel></rss>"#
    );
    let source = FixtureSource(xml);
    let store = MemStore::new(None);
    let sender = Arc::new(RecordingSender::default());

    let report = run_once(&source, &store, sender.clone(), 10)
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);

    let sent = sender.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].primary_text.len(), 280);
    assert!(sent[0].primary_text.chars().all(|c| c == 'x'));
    assert!(sent[1].primary_text.starts_with("xxxx"));
    assert!(sent[1]
        .primary_text
        .ends_with("https://blog.example.test/long"));
}
