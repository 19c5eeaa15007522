pub mod dispatcher;
pub mod webhook;

use anyhow::Result;

/// Outbound destination variant. The two configured webhook events differ
/// only in whether the payload carries a media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Default,
    WithMedia,
}

/// One bounded chunk of an item's content, ready for payload assembly.
/// `has_media` is true only on the first segment of an item that has media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub has_media: bool,
}

/// What actually goes over the wire, one per segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPayload {
    pub primary_text: String,
    pub media_url: Option<String>,
    pub channel: Channel,
}

#[async_trait::async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, payload: &OutboundPayload) -> Result<()>;
}
