//! Outbound reply client. One reply token, one text payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::traits::Gateway;
use crate::utils::truncate_str;

/// Upper bound the messaging platform accepts for one text message.
const MAX_REPLY_CHARS: usize = 5000;

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct LineGateway {
    client: Client,
    reply_url: String,
    access_token: String,
}

impl LineGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build gateway HTTP client");
        Self {
            client,
            reply_url: config.reply_url.clone(),
            access_token: config.access_token.clone(),
        }
    }
}

#[async_trait]
impl Gateway for LineGateway {
    async fn reply(&self, reply_token: &str, text: &str) -> anyhow::Result<()> {
        let text = truncate_str(text, MAX_REPLY_CHARS);
        let body = json!({
            "replyToken": reply_token,
            "messages": [ { "type": "text", "text": text } ],
        });

        let resp = self
            .client
            .post(&self.reply_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("reply API returned {}: {}", status, truncate_str(&detail, 300));
        }
        debug!("reply delivered");
        Ok(())
    }
}
