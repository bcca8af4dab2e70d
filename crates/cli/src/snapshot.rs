//! Offline cluster snapshots
//!
//! A snapshot is a JSON document `{"workloads": [...], "node_groups": [...]}`
//! holding workload descriptors and node groups, for runs without cluster
//! access.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sizing_lib::{NodeGroup, WorkloadDescriptor};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub workloads: Vec<WorkloadDescriptor>,
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}
