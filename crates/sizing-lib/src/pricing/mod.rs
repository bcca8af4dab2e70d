//! Pricing resolution
//!
//! Resolves an on-demand hourly rate for an instance type by trying an
//! ordered list of strategies: the authoritative AWS Price List API first,
//! a community price service second. The first success wins; when every
//! strategy fails the quote is tagged `unavailable` with a zero rate.
//! Retries, if any, belong to the sources themselves.

mod aws;
mod community;

pub use aws::{parse_on_demand_price, AwsPricingSource, PRICING_API_REGION};
pub use community::CommunityPriceSource;

use crate::config::SizingConfig;
use crate::models::{PricingQuote, PricingSource};
use crate::observability::StructuredLogger;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single source of on-demand prices
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Hourly on-demand USD rate for one node of `instance_type` in `region`
    async fn hourly_price(&self, instance_type: &str, region: &str) -> Result<f64>;
}

/// Ordered pricing strategies with fallback
#[derive(Clone, Default)]
pub struct PricingResolver {
    strategies: Vec<(PricingSource, Arc<dyn PriceSource>)>,
    logger: StructuredLogger,
}

impl PricingResolver {
    /// Resolver with no sources; every quote is `unavailable`
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            strategies: Vec::new(),
            logger,
        }
    }

    pub fn with_authoritative(self, source: Arc<dyn PriceSource>) -> Self {
        self.with_strategy(PricingSource::Authoritative, source)
    }

    pub fn with_community(self, source: Arc<dyn PriceSource>) -> Self {
        self.with_strategy(PricingSource::Community, source)
    }

    /// Replace the strategy for `tag`, keeping authoritative ahead of community
    fn with_strategy(mut self, tag: PricingSource, source: Arc<dyn PriceSource>) -> Self {
        self.strategies.retain(|(existing, _)| *existing != tag);
        self.strategies.push((tag, source));
        self.strategies
            .sort_by_key(|(tag, _)| *tag != PricingSource::Authoritative);
        self
    }

    /// Build the sources enabled in `config`
    pub async fn from_config(config: &SizingConfig, logger: StructuredLogger) -> Result<Self> {
        let mut resolver = Self::new(logger);
        let timeout = config.pricing_request_timeout();

        if config.pricing.authoritative_enabled {
            resolver = resolver.with_authoritative(Arc::new(AwsPricingSource::from_env(timeout).await));
        }
        if config.pricing.community_enabled {
            resolver = resolver.with_community(Arc::new(CommunityPriceSource::new(
                &config.pricing.community_url,
                timeout,
            )?));
        }

        Ok(resolver)
    }

    /// Strategies in the order they are tried
    pub fn strategies(&self) -> &[(PricingSource, Arc<dyn PriceSource>)] {
        &self.strategies
    }

    /// Resolve a quote, falling back through the strategies in order
    pub async fn resolve(&self, instance_type: &str, region: &str) -> PricingQuote {
        for (tag, source) in &self.strategies {
            let outcome = source
                .hourly_price(instance_type, region)
                .await
                .and_then(|price| validate_price(source.name(), price));

            match outcome {
                Ok(hourly_usd) => {
                    let quote = PricingQuote {
                        instance_type: instance_type.to_string(),
                        region: region.to_string(),
                        hourly_usd,
                        source: *tag,
                    };
                    self.logger.log_pricing_outcome(&quote);
                    return quote;
                }
                Err(e) => {
                    self.logger
                        .log_pricing_attempt_failed(source.name(), instance_type, region, &e);
                }
            }
        }

        let quote = PricingQuote::unavailable(instance_type, region);
        self.logger.log_pricing_outcome(&quote);
        quote
    }
}

fn validate_price(source: &str, price: f64) -> Result<f64> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        anyhow::bail!("{} returned an invalid price: {}", source, price)
    }
}
