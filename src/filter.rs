//! Selects which feed items a run should republish.

use crate::ingest::types::FeedItem;

/// Items carrying this tag (any case) are never republished.
pub const EXCLUSION_TAG: &str = "nocrosspost";

/// Pick the new items out of a newest-first feed snapshot.
///
/// At most `max_items` are considered, taken from the head. An item is new
/// when there is no checkpoint yet or it was published strictly after it.
/// Tag-excluded items are dropped from the selection but still advance the
/// checkpoint candidate, so they are never looked at again.
///
/// The returned selection is in dispatch order, the reverse of feed order:
/// oldest new item first. If delivery is interrupted partway, the items
/// already sent are the oldest ones, and the unadvanced checkpoint
/// re-selects the newer ones on the next run.
///
/// The head-of-feed cap assumes the upstream orders newest-first; an
/// out-of-order feed can push an old item past the cap. Accepted limitation.
pub fn select_new_items(
    items: &[FeedItem],
    last_checkpoint: Option<i64>,
    max_items: usize,
) -> (Vec<FeedItem>, Option<i64>) {
    let considered = &items[..items.len().min(max_items)];

    let mut new_checkpoint = last_checkpoint;
    let mut selected = Vec::new();

    for item in considered {
        let is_new = last_checkpoint.is_none_or(|c| item.published_at > c);
        if !is_new {
            continue;
        }
        if new_checkpoint.is_none_or(|c| item.published_at > c) {
            new_checkpoint = Some(item.published_at);
        }
        if item.has_tag(EXCLUSION_TAG) {
            tracing::debug!(guid = %item.guid, "item excluded by tag");
            continue;
        }
        selected.push(item.clone());
    }

    selected.reverse();
    (selected, new_checkpoint)
}
