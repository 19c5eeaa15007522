// src/ingest/types.rs
use anyhow::Result;

/// One parsed entry from the syndication feed. Immutable once parsed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub guid: String,
    pub permalink: String,
    /// Publication time in epoch milliseconds; 0 when the feed date was
    /// missing or unparseable (such items never outrun a real checkpoint).
    pub published_at: i64,
    /// Item body as published, markup included.
    pub raw_content: String,
    pub media_url: Option<String>,
    pub tags: Vec<String>,
}

impl FeedItem {
    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Upstream feed document fetcher. Parsing is a separate, pure step so
/// fetch and parse failures stay distinguishable.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_document(&self) -> Result<String>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_match_is_case_insensitive() {
        let item = FeedItem {
            guid: "g".into(),
            permalink: "https://example.test/p".into(),
            published_at: 1,
            raw_content: "body".into(),
            media_url: None,
            tags: vec!["NoCrossPost".into()],
        };
        assert!(item.has_tag("nocrosspost"));
        assert!(!item.has_tag("draft"));
    }
}
