//! Community price service client
//!
//! Queries an ec2.shop-compatible endpoint:
//! `GET <base>?region=<region>&filter=<instance type>` with `Accept: json`.

use super::PriceSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct PriceListing {
    #[serde(rename = "Prices", default)]
    prices: Vec<PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(rename = "InstanceType")]
    instance_type: String,
    #[serde(rename = "Cost")]
    cost: f64,
}

/// HTTP client for the community price service
pub struct CommunityPriceSource {
    client: Client,
    base_url: Url,
}

impl CommunityPriceSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid community pricing URL")?;

        Ok(Self { client, base_url })
    }

    fn request_url(&self, instance_type: &str, region: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("region", region)
            .append_pair("filter", instance_type);
        url
    }
}

#[async_trait]
impl PriceSource for CommunityPriceSource {
    fn name(&self) -> &str {
        "community"
    }

    async fn hourly_price(&self, instance_type: &str, region: &str) -> Result<f64> {
        let response = self
            .client
            .get(self.request_url(instance_type, region))
            .header(reqwest::header::ACCEPT, "json")
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("community pricing error ({}): {}", status, body);
        }

        let listing: PriceListing = response.json().await.context("Failed to parse response")?;

        // The filter is a substring match, so `m5.large` also returns `m5.large` variants
        listing
            .prices
            .into_iter()
            .find(|entry| entry.instance_type == instance_type)
            .map(|entry| entry.cost)
            .with_context(|| format!("no community price for {} in {}", instance_type, region))
    }
}
