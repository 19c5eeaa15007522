use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Channel, OutboundPayload, WebhookSender};

pub const DEFAULT_BASE_URL: &str = "https://maker.ifttt.com";

/// Maker-style webhook sender: posts to
/// `{base}/trigger/{event}/with/key/{key}`, where the event name depends on
/// whether the payload carries media.
#[derive(Clone)]
pub struct MakerWebhookSender {
    base_url: String,
    key: String,
    event_default: String,
    event_media: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl MakerWebhookSender {
    pub fn new(base_url: String, key: String, event_default: String, event_media: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key,
            event_default,
            event_media,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    fn trigger_url(&self, channel: Channel) -> String {
        let event = match channel {
            Channel::Default => &self.event_default,
            Channel::WithMedia => &self.event_media,
        };
        format!("{}/trigger/{}/with/key/{}", self.base_url, event, self.key)
    }
}

#[async_trait::async_trait]
impl WebhookSender for MakerWebhookSender {
    async fn send(&self, payload: &OutboundPayload) -> Result<()> {
        let url = self.trigger_url(payload.channel);
        let body = MakerBody {
            value1: &payload.primary_text,
            value2: payload.media_url.as_deref(),
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("webhook HTTP error: {e}"));
                    }
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("webhook request failed: {e}"));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct MakerBody<'a> {
    value1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value2: Option<&'a str>,
}
