//! Per-item delivery: segments become payloads, sent strictly in order.

use anyhow::{Context, Result};

use super::{Channel, OutboundPayload, Segment, WebhookSender};
use crate::ingest::types::FeedItem;

/// Attach media to the segment run: only the first segment of an item that
/// has a media URL gets it.
pub fn build_segments(item: &FeedItem, texts: Vec<String>) -> Vec<Segment> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Segment {
            text,
            has_media: i == 0 && item.media_url.is_some(),
        })
        .collect()
}

fn payload_for(item: &FeedItem, seg: &Segment) -> OutboundPayload {
    if seg.has_media {
        OutboundPayload {
            primary_text: seg.text.clone(),
            media_url: item.media_url.clone(),
            channel: Channel::WithMedia,
        }
    } else {
        OutboundPayload {
            primary_text: seg.text.clone(),
            media_url: None,
            channel: Channel::Default,
        }
    }
}

/// Send one item's segments sequentially. The first failed send aborts the
/// rest of this item (a truncated multi-part post is worse than a short
/// one), leaving other items in the batch untouched.
pub async fn dispatch_item(
    item: &FeedItem,
    segments: &[Segment],
    sender: &dyn WebhookSender,
) -> Result<()> {
    for (i, seg) in segments.iter().enumerate() {
        let payload = payload_for(item, seg);
        sender
            .send(&payload)
            .await
            .with_context(|| format!("sending segment {}/{} of {}", i + 1, segments.len(), item.guid))?;
    }
    Ok(())
}
