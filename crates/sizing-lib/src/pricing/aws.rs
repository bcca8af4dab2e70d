//! AWS Price List API source
//!
//! Uses `GetProducts` on the `AmazonEC2` service code. The Price List API is
//! only served from a few regions, so the client always targets
//! [`PRICING_API_REGION`] while the requested region goes into the filters.

use super::PriceSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_pricing::types::{Filter, FilterType};
use serde_json::Value;
use std::time::Duration;

/// Region hosting the Price List API endpoint
pub const PRICING_API_REGION: &str = "us-east-1";

/// Authoritative on-demand prices from AWS
pub struct AwsPricingSource {
    client: aws_sdk_pricing::Client,
}

impl AwsPricingSource {
    pub fn new(client: aws_sdk_pricing::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain
    pub async fn from_env(timeout: Duration) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(PRICING_API_REGION))
            .timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            )
            .load()
            .await;

        Self::new(aws_sdk_pricing::Client::new(&sdk_config))
    }
}

fn term_filter(field: &str, value: &str) -> Result<Filter> {
    Filter::builder()
        .r#type(FilterType::TermMatch)
        .field(field)
        .value(value)
        .build()
        .with_context(|| format!("Invalid price list filter {}={}", field, value))
}

#[async_trait]
impl PriceSource for AwsPricingSource {
    fn name(&self) -> &str {
        "aws-price-list"
    }

    async fn hourly_price(&self, instance_type: &str, region: &str) -> Result<f64> {
        let filters = [
            ("instanceType", instance_type),
            ("regionCode", region),
            ("operatingSystem", "Linux"),
            ("tenancy", "Shared"),
            ("preInstalledSw", "NA"),
            ("capacitystatus", "Used"),
        ];

        let mut request = self
            .client
            .get_products()
            .service_code("AmazonEC2")
            .format_version("aws_v1")
            .max_results(10);
        for (field, value) in filters {
            request = request.filters(term_filter(field, value)?);
        }

        let output = request
            .send()
            .await
            .context("GetProducts request failed")?;

        for product in output.price_list() {
            if let Some(price) = parse_on_demand_price(product)? {
                return Ok(price);
            }
        }

        anyhow::bail!("no on-demand price for {} in {}", instance_type, region)
    }
}

/// Extract the hourly on-demand USD rate from one price-list product document.
///
/// Returns `Ok(None)` when the document has no hourly on-demand dimension.
pub fn parse_on_demand_price(product: &str) -> Result<Option<f64>> {
    let document: Value = serde_json::from_str(product).context("Invalid price list document")?;

    let Some(on_demand) = document
        .pointer("/terms/OnDemand")
        .and_then(Value::as_object)
    else {
        return Ok(None);
    };

    for term in on_demand.values() {
        let Some(dimensions) = term.get("priceDimensions").and_then(Value::as_object) else {
            continue;
        };
        for dimension in dimensions.values() {
            if dimension.get("unit").and_then(Value::as_str) != Some("Hrs") {
                continue;
            }
            if let Some(usd) = dimension
                .pointer("/pricePerUnit/USD")
                .and_then(Value::as_str)
            {
                let price: f64 = usd
                    .parse()
                    .with_context(|| format!("Invalid USD price {:?}", usd))?;
                if price > 0.0 {
                    return Ok(Some(price));
                }
            }
        }
    }

    Ok(None)
}
