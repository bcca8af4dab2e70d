//! Instance catalog
//!
//! Static table of candidate machine shapes. The catalog is an immutable
//! value handed to the engine and the capacity introspector; it is never
//! mutated during a run.

use crate::error::{Result, SizingError};
use crate::models::InstanceTypeSpec;
use std::collections::HashMap;
use std::sync::Arc;

/// Size suffixes and their vCPU counts for the standard families
const SIZES: &[(&str, u32)] = &[
    ("large", 2),
    ("xlarge", 4),
    ("2xlarge", 8),
    ("4xlarge", 16),
    ("8xlarge", 32),
];

/// (family, GiB per vCPU, size suffixes beyond the standard ones)
const FAMILIES: &[(&str, f64, &[(&str, u32)])] = &[
    ("m5", 4.0, &[("12xlarge", 48), ("16xlarge", 64), ("24xlarge", 96)]),
    ("m5a", 4.0, &[]),
    ("m6i", 4.0, &[("12xlarge", 48), ("16xlarge", 64)]),
    ("m6a", 4.0, &[]),
    ("m6g", 4.0, &[("medium", 1)]),
    ("m7i", 4.0, &[("12xlarge", 48)]),
    ("m7g", 4.0, &[("medium", 1)]),
    ("c5", 2.0, &[("9xlarge", 36), ("12xlarge", 48)]),
    ("c6i", 2.0, &[("12xlarge", 48)]),
    ("c6g", 2.0, &[("medium", 1)]),
    ("c7i", 2.0, &[]),
    ("r5", 8.0, &[]),
    ("r6i", 8.0, &[]),
];

/// Burstable shapes whose memory does not follow a fixed ratio
const T3: &[(&str, u32, f64)] = &[
    ("t3.small", 2, 2.0),
    ("t3.medium", 2, 4.0),
    ("t3.large", 2, 8.0),
    ("t3.xlarge", 4, 16.0),
    ("t3.2xlarge", 8, 32.0),
];

/// Read-only table of instance shapes
#[derive(Debug, Clone)]
pub struct InstanceCatalog {
    entries: Arc<[InstanceTypeSpec]>,
    index: Arc<HashMap<String, usize>>,
}

impl InstanceCatalog {
    /// Build a catalog from explicit entries, validating every shape
    pub fn from_specs(specs: Vec<InstanceTypeSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if spec.vcpu == 0 || !(spec.memory_gib > 0.0) {
                return Err(SizingError::InvalidCatalogEntry {
                    name: spec.name.clone(),
                });
            }
            index.insert(spec.name.clone(), i);
        }

        Ok(Self {
            entries: specs.into(),
            index: Arc::new(index),
        })
    }

    /// Built-in AWS general purpose, compute and memory optimized shapes
    pub fn builtin() -> Self {
        let mut specs: Vec<InstanceTypeSpec> = T3
            .iter()
            .map(|(name, vcpu, mem)| InstanceTypeSpec::new(*name, *vcpu, *mem))
            .collect();

        for (family, gib_per_vcpu, extra) in FAMILIES {
            for (size, vcpu) in extra.iter().filter(|(s, _)| *s == "medium") {
                specs.push(family_spec(family, size, *vcpu, *gib_per_vcpu));
            }
            for (size, vcpu) in SIZES.iter().chain(extra.iter().filter(|(s, _)| *s != "medium")) {
                specs.push(family_spec(family, size, *vcpu, *gib_per_vcpu));
            }
        }

        let index = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        Self {
            entries: specs.into(),
            index: Arc::new(index),
        }
    }

    pub fn get(&self, instance_type: &str) -> Option<&InstanceTypeSpec> {
        self.index.get(instance_type).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[InstanceTypeSpec] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose family starts with one of `prefixes`.
    ///
    /// Prefix matching means `m5` admits `m5`, `m5a`, `m5n` and so on.
    pub fn filter_families<S: AsRef<str>>(&self, prefixes: &[S]) -> Vec<InstanceTypeSpec> {
        self.entries
            .iter()
            .filter(|spec| {
                prefixes.iter().any(|p| {
                    let p = p.as_ref().trim();
                    !p.is_empty() && spec.family_prefix.starts_with(p)
                })
            })
            .cloned()
            .collect()
    }

    /// Like [`filter_families`](Self::filter_families) but an empty result is fatal
    pub fn restricted_to<S: AsRef<str>>(&self, prefixes: &[S]) -> Result<Vec<InstanceTypeSpec>> {
        let filtered = self.filter_families(prefixes);
        if filtered.is_empty() {
            return Err(SizingError::EmptyCatalog {
                families: prefixes.iter().map(|p| p.as_ref().to_string()).collect(),
            });
        }
        Ok(filtered)
    }
}

impl Default for InstanceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn family_spec(family: &str, size: &str, vcpu: u32, gib_per_vcpu: f64) -> InstanceTypeSpec {
    InstanceTypeSpec::new(format!("{}.{}", family, size), vcpu, vcpu as f64 * gib_per_vcpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries_are_valid_and_unique() {
        let catalog = InstanceCatalog::builtin();
        assert!(catalog.len() > 50);
        for spec in catalog.entries() {
            assert!(spec.vcpu > 0, "{} has no vCPUs", spec.name);
            assert!(spec.memory_gib > 0.0, "{} has no memory", spec.name);
            assert_eq!(catalog.get(&spec.name), Some(spec));
        }
        assert_eq!(catalog.index.len(), catalog.len());
    }

    #[test]
    fn test_known_shapes() {
        let catalog = InstanceCatalog::builtin();

        let m5a = catalog.get("m5a.2xlarge").unwrap();
        assert_eq!(m5a.vcpu, 8);
        assert_eq!(m5a.memory_gib, 32.0);

        let c5 = catalog.get("c5.9xlarge").unwrap();
        assert_eq!(c5.vcpu, 36);
        assert_eq!(c5.memory_gib, 72.0);

        let r5 = catalog.get("r5.large").unwrap();
        assert_eq!(r5.memory_gib, 16.0);

        let m6g = catalog.get("m6g.medium").unwrap();
        assert_eq!((m6g.vcpu, m6g.memory_gib), (1, 4.0));

        assert!(catalog.get("p3.2xlarge").is_none());
    }

    #[test]
    fn test_filter_matches_family_prefix() {
        let catalog = InstanceCatalog::builtin();
        let filtered = catalog.filter_families(&["m5"]);
        assert!(filtered.iter().any(|s| s.name == "m5.large"));
        assert!(filtered.iter().any(|s| s.name == "m5a.large"));
        assert!(filtered.iter().all(|s| s.family_prefix.starts_with("m5")));
    }

    #[test]
    fn test_default_families_exclude_memory_optimized() {
        let catalog = InstanceCatalog::builtin();
        let filtered = catalog.filter_families(crate::config::DEFAULT_ALLOWED_FAMILIES);
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|s| !s.family_prefix.starts_with('r')));
    }

    #[test]
    fn test_restricted_to_unknown_family_is_fatal() {
        let catalog = InstanceCatalog::builtin();
        let err = catalog.restricted_to(&["x2gd"]).unwrap_err();
        assert!(matches!(err, SizingError::EmptyCatalog { .. }));
    }

    #[test]
    fn test_from_specs_rejects_zero_memory() {
        let err = InstanceCatalog::from_specs(vec![InstanceTypeSpec::new("bad.large", 2, 0.0)])
            .unwrap_err();
        assert!(matches!(err, SizingError::InvalidCatalogEntry { name } if name == "bad.large"));
    }
}
