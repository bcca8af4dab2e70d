//! Sizing configuration
//!
//! Values are layered from an optional config file and `KUBESIZE_*`
//! environment variables (nested keys use `__`, e.g.
//! `KUBESIZE_PRICING__COMMUNITY_URL`).

use crate::error::{Result, SizingError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Minimum node count of any recommendation. Not configurable.
pub const MIN_NODE_FLOOR: u32 = 3;

pub const DEFAULT_HEADROOM_FRACTION: f64 = 0.20;

pub const DEFAULT_TOP_N: usize = 5;

/// Upper bound on surfaced alternatives
pub const MAX_TOP_N: usize = 5;

pub const DEFAULT_ALLOWED_FAMILIES: &[&str] = &["t3", "m5", "m6", "m7", "c5", "c6", "c7"];

pub const HOURS_PER_MONTH: f64 = 730.0;

pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Configuration consumed by a sizing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Buffer added on top of observed requests
    #[serde(default = "default_headroom_fraction")]
    pub headroom_fraction: f64,

    /// Family prefixes a candidate's family must start with
    #[serde(default = "default_allowed_families")]
    pub allowed_families: Vec<String>,

    /// Number of ranked candidates to surface
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Region used for pricing lookups
    #[serde(default = "default_region")]
    pub region: String,

    /// Overall run deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum pricing lookups in flight
    #[serde(default = "default_pricing_concurrency")]
    pub pricing_concurrency: usize,

    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Pricing source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Query the AWS Price List API first
    #[serde(default = "default_true")]
    pub authoritative_enabled: bool,

    /// Fall back to the community price service
    #[serde(default = "default_true")]
    pub community_enabled: bool,

    /// Base URL of the community price service
    #[serde(default = "default_community_url")]
    pub community_url: String,

    /// Per-request timeout for pricing calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_headroom_fraction() -> f64 {
    DEFAULT_HEADROOM_FRACTION
}

fn default_allowed_families() -> Vec<String> {
    DEFAULT_ALLOWED_FAMILIES.iter().map(|f| f.to_string()).collect()
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_pricing_concurrency() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_community_url() -> String {
    "https://ec2.shop".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            headroom_fraction: default_headroom_fraction(),
            allowed_families: default_allowed_families(),
            top_n: default_top_n(),
            region: default_region(),
            timeout_secs: default_timeout_secs(),
            pricing_concurrency: default_pricing_concurrency(),
            pricing: PricingConfig::default(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            authoritative_enabled: true,
            community_enabled: true,
            community_url: default_community_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SizingConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// The result is not validated: callers layer their own overrides first
    /// and then call [`SizingConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`SizingConfig::load`], reading `KUBESIZE_*` variables from `env`
    /// instead of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("KUBESIZE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("allowed_families")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.headroom_fraction.is_finite() || self.headroom_fraction < 0.0 {
            return Err(SizingError::InvalidConfig(format!(
                "headroom_fraction must be a non-negative number, got {}",
                self.headroom_fraction
            )));
        }
        if !(1..=MAX_TOP_N).contains(&self.top_n) {
            return Err(SizingError::InvalidConfig(format!(
                "top_n must be between 1 and {}, got {}",
                MAX_TOP_N, self.top_n
            )));
        }
        if self.pricing_concurrency == 0 {
            return Err(SizingError::InvalidConfig(
                "pricing_concurrency must be at least 1".to_string(),
            ));
        }
        if self.allowed_families.iter().all(|f| f.trim().is_empty()) {
            return Err(SizingError::InvalidConfig(
                "allowed_families must name at least one family".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pricing_request_timeout(&self) -> Duration {
        Duration::from_secs(self.pricing.request_timeout_secs)
    }
}
