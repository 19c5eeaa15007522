//! One crossposting run: fetch → parse → filter → dispatch → commit.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use thiserror::Error;

use crate::checkpoint::CheckpointStore;
use crate::filter::select_new_items;
use crate::ingest::normalize_content;
use crate::ingest::rss::parse_feed;
use crate::ingest::types::{FeedItem, FeedSource};
use crate::notify::dispatcher::{build_segments, dispatch_item};
use crate::notify::WebhookSender;
use crate::segment::{segment, MAX_WEIGHTED_LEN, SEGMENT_SEPARATOR};

/// One-time metrics registration (so series show up wherever they export).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crosspost_runs_total", "Total crossposting runs started.");
        describe_counter!("feed_items_total", "Total items parsed from the feed.");
        describe_counter!(
            "crosspost_items_selected_total",
            "Items selected as new for dispatch."
        );
        describe_counter!(
            "crosspost_dispatch_errors_total",
            "Items whose webhook delivery failed."
        );
        describe_counter!(
            "crosspost_checkpoint_write_errors_total",
            "Failed checkpoint commits."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("crosspost_last_run_ts", "Unix ts when a run last completed.");
    });
}

/// Fatal run failures. Per-item dispatch trouble is not here: it degrades
/// the run but never aborts it.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("feed fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),
    #[error("feed parse failed: {0:#}")]
    Parse(#[source] anyhow::Error),
    #[error("checkpoint load failed: {0:#}")]
    CheckpointLoad(#[source] anyhow::Error),
}

/// Outcome summary of a completed (possibly degraded) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub considered: usize,
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
    pub checkpoint_before: Option<i64>,
    pub checkpoint_after: Option<i64>,
    pub checkpoint_written: bool,
}

/// Execute one full pass over the feed.
///
/// Fetch, parse, and checkpoint-load failures abort with no checkpoint
/// mutation. Dispatch runs one spawned task per selected item (oldest
/// first); the run waits for every task to settle, then commits the
/// checkpoint regardless of per-item outcomes — it tracks publish time
/// seen, not delivery success. An item whose delivery failed is therefore
/// not retried on the next run; that loss is accepted for forward progress.
///
/// Concurrent runs against the same checkpoint race on read/write; callers
/// are expected to schedule one invocation at a time.
pub async fn run_once(
    source: &dyn FeedSource,
    store: &dyn CheckpointStore,
    sender: Arc<dyn WebhookSender>,
    max_items: usize,
) -> Result<RunReport, RunError> {
    ensure_metrics_described();
    counter!("crosspost_runs_total").increment(1);

    let document = source.fetch_document().await.map_err(RunError::Fetch)?;
    let items = parse_feed(&document).map_err(RunError::Parse)?;
    let checkpoint_before = store.get().await.map_err(RunError::CheckpointLoad)?;

    let considered = items.len().min(max_items);
    let (selected, checkpoint_after) = select_new_items(&items, checkpoint_before, max_items);
    let selected_count = selected.len();
    counter!("crosspost_items_selected_total").increment(selected_count as u64);
    tracing::info!(
        source = source.name(),
        considered,
        selected = selected_count,
        "feed filtered"
    );

    // One task per item, spawned in dispatch order. Tasks settle
    // independently; none cancels its siblings.
    let mut handles = Vec::with_capacity(selected_count);
    for item in selected {
        let sender = Arc::clone(&sender);
        handles.push(tokio::spawn(
            async move { deliver_item(item, sender).await },
        ));
    }

    let mut delivered = 0usize;
    let mut failed = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => delivered += 1,
            Ok(Err(e)) => {
                failed += 1;
                counter!("crosspost_dispatch_errors_total").increment(1);
                tracing::warn!(error = ?e, "item dispatch failed");
            }
            Err(e) => {
                failed += 1;
                counter!("crosspost_dispatch_errors_total").increment(1);
                tracing::warn!(error = ?e, "item dispatch task aborted");
            }
        }
    }

    // Commit after the settle barrier, at most once per run. Skipped when
    // nothing moved the candidate forward.
    let mut checkpoint_written = false;
    if let Some(value) = checkpoint_after {
        if checkpoint_before != Some(value) {
            match store.put(value).await {
                Ok(()) => checkpoint_written = true,
                Err(e) => {
                    counter!("crosspost_checkpoint_write_errors_total").increment(1);
                    tracing::warn!(
                        error = ?e,
                        value,
                        "checkpoint write failed; next run will reprocess this batch"
                    );
                }
            }
        }
    }

    gauge!("crosspost_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    Ok(RunReport {
        considered,
        selected: selected_count,
        delivered,
        failed,
        checkpoint_before,
        checkpoint_after,
        checkpoint_written,
    })
}

/// Normalize, append the origin permalink, split, and send one item.
async fn deliver_item(item: FeedItem, sender: Arc<dyn WebhookSender>) -> anyhow::Result<()> {
    let mut text = normalize_content(&item.raw_content);
    if !item.permalink.is_empty() {
        if text.is_empty() {
            text = item.permalink.clone();
        } else {
            text = format!("{} {}", text, item.permalink);
        }
    }
    if text.is_empty() {
        tracing::debug!(guid = %item.guid, "empty item, nothing to post");
        return Ok(());
    }

    let texts = segment(&text, MAX_WEIGHTED_LEN, SEGMENT_SEPARATOR);
    let segments = build_segments(&item, texts);
    dispatch_item(&item, &segments, sender.as_ref()).await
}
