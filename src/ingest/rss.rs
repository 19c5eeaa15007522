use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    guid: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    enclosure: Vec<Enclosure>,
    #[serde(default)]
    category: Vec<String>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

fn parse_rfc2822_to_unix_ms(ts: &str) -> i64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp_nanos() / 1_000_000)
        .and_then(|ms| i64::try_from(ms).ok())
        .unwrap_or(0)
        .max(0)
}

/// Parse an RSS 2.0 document into feed items, newest-first as published.
///
/// Items without a link keep their guid as permalink fallback; only the
/// first enclosure URL is taken as media.
pub fn parse_feed(document: &str) -> Result<Vec<FeedItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(document);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let permalink = it.link.clone().unwrap_or_default();
        let guid = it.guid.unwrap_or_else(|| permalink.clone());
        out.push(FeedItem {
            guid,
            permalink,
            published_at: it
                .pub_date
                .as_deref()
                .map(parse_rfc2822_to_unix_ms)
                .unwrap_or(0),
            raw_content: it.description.unwrap_or_default(),
            media_url: it.enclosure.into_iter().find_map(|e| e.url),
            tags: it
                .category
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_items_total").increment(out.len() as u64);
    Ok(out)
}

/// Feed source backed by an HTTP GET of the configured feed URL.
pub struct RssFeedSource {
    url: String,
    client: reqwest::Client,
}

impl RssFeedSource {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_document(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("feed http get()")?;
        resp.error_for_status_ref()
            .context("feed http non-2xx")?;
        resp.text().await.context("feed http .text()")
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
