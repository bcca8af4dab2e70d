//! Cluster sizing library
//!
//! This crate provides the core functionality for:
//! - Aggregating workload resource requests across a cluster
//! - Computing current capacity from node groups
//! - Sizing and ranking node-pool options from an instance catalog
//! - Resolving on-demand prices with source fallback
//! - Assembling structured sizing reports

pub mod aggregator;
pub mod analysis;
pub mod capacity;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod report;

pub use analysis::{Analyzer, AnalyzerBuilder};
pub use catalog::InstanceCatalog;
pub use config::SizingConfig;
pub use error::{Result, SizingError};
pub use models::*;
pub use observability::StructuredLogger;
pub use report::{CapacityReport, Notice, Severity, SizingReport};
