//! Error taxonomy for sizing runs
//!
//! Only fatal conditions are errors. Degraded-but-complete outcomes
//! (unknown instance types, missing prices) are carried in the report
//! as notices instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SizingError>;

#[derive(Debug, Error)]
pub enum SizingError {
    #[error("failed to enumerate workloads: {0:#}")]
    WorkloadEnumeration(#[source] anyhow::Error),

    #[error("failed to enumerate node groups: {0:#}")]
    NodeGroupEnumeration(#[source] anyhow::Error),

    #[error("no catalog instance types match the allowed families [{}]", families.join(", "))]
    EmptyCatalog { families: Vec<String> },

    #[error("invalid catalog entry {name}: vcpu and memory must be positive")]
    InvalidCatalogEntry { name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("timed out during {stage}")]
    Timeout { stage: &'static str },
}
