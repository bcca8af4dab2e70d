//! Recommendation engine
//!
//! Sizes every allowed catalog shape against the required resources,
//! ranks the results by waste and surfaces the top N. Sizing and ranking
//! are pure functions of the catalog and the requirement; only the
//! surfaced candidates are priced.
//!
//! Ranking, each rule applied only on a tie of the previous one:
//! 1. ascending average waste
//! 2. ascending node count
//! 3. larger shape first (`vcpu * memory_gib`), or smaller shape first when
//!    nothing is required at all
//! 4. instance type name

use crate::catalog::InstanceCatalog;
use crate::config::{HOURS_PER_MONTH, HOURS_PER_YEAR, MAX_TOP_N, MIN_NODE_FLOOR};
use crate::error::{Result, SizingError};
use crate::models::{
    InstanceTypeSpec, PricingQuote, Recommendation, RecommendationCandidate, RequiredResources,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Tie-break on shape size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapePreference {
    Larger,
    Smaller,
}

impl ShapePreference {
    /// Larger shapes reduce node overhead; with no demand at all the
    /// smallest shape at the node floor is the sensible answer.
    pub fn for_required(required: &RequiredResources) -> Self {
        if required.is_zero() {
            ShapePreference::Smaller
        } else {
            ShapePreference::Larger
        }
    }
}

/// A catalog shape sized against the requirement, not yet priced
#[derive(Debug, Clone, PartialEq)]
pub struct SizedCandidate {
    pub spec: InstanceTypeSpec,
    pub node_count: u32,
    pub total_cpu_cores: f64,
    pub total_memory_gib: f64,
    pub cpu_waste_pct: f64,
    pub memory_waste_pct: f64,
    pub avg_waste_pct: f64,
}

impl SizedCandidate {
    /// Attach a price quote and derive costs for the whole pool
    pub fn priced(self, pricing: PricingQuote) -> RecommendationCandidate {
        let hourly_cost = pricing.hourly_usd * f64::from(self.node_count);
        RecommendationCandidate {
            instance_type: self.spec.name,
            node_count: self.node_count,
            total_cpu_cores: self.total_cpu_cores,
            total_memory_gib: self.total_memory_gib,
            cpu_waste_pct: self.cpu_waste_pct,
            memory_waste_pct: self.memory_waste_pct,
            avg_waste_pct: self.avg_waste_pct,
            pricing,
            hourly_cost,
            monthly_cost: hourly_cost * HOURS_PER_MONTH,
            yearly_cost: hourly_cost * HOURS_PER_YEAR,
        }
    }
}

/// Smallest node count of `spec` covering both dimensions, never below the floor.
///
/// Saturates at `u32::MAX` when the requirement cannot be met.
pub fn node_count_for(spec: &InstanceTypeSpec, required: &RequiredResources) -> u32 {
    let vcpu = f64::from(spec.vcpu);
    let by_cpu = nodes_needed(required.cpu_cores, vcpu);
    let by_memory = nodes_needed(required.memory_gib, spec.memory_gib);
    let mut nodes = MIN_NODE_FLOOR.max(by_cpu).max(by_memory);

    // Division rounding must never leave a dimension short
    while nodes < u32::MAX
        && (f64::from(nodes) * vcpu < required.cpu_cores
            || f64::from(nodes) * spec.memory_gib < required.memory_gib)
    {
        nodes += 1;
    }

    nodes
}

fn nodes_needed(required: f64, per_node: f64) -> u32 {
    (required / per_node).ceil().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Size one shape
pub fn size_candidate(spec: &InstanceTypeSpec, required: &RequiredResources) -> SizedCandidate {
    let node_count = node_count_for(spec, required);
    let total_cpu_cores = f64::from(node_count) * f64::from(spec.vcpu);
    let total_memory_gib = f64::from(node_count) * spec.memory_gib;
    let cpu_waste_pct = 1.0 - required.cpu_cores / total_cpu_cores;
    let memory_waste_pct = 1.0 - required.memory_gib / total_memory_gib;

    SizedCandidate {
        spec: spec.clone(),
        node_count,
        total_cpu_cores,
        total_memory_gib,
        cpu_waste_pct,
        memory_waste_pct,
        avg_waste_pct: (cpu_waste_pct + memory_waste_pct) / 2.0,
    }
}

/// Total order used for ranking
pub fn rank_order(a: &SizedCandidate, b: &SizedCandidate, preference: ShapePreference) -> Ordering {
    a.avg_waste_pct
        .total_cmp(&b.avg_waste_pct)
        .then(a.node_count.cmp(&b.node_count))
        .then_with(|| match preference {
            ShapePreference::Larger => b.spec.shape_size().total_cmp(&a.spec.shape_size()),
            ShapePreference::Smaller => a.spec.shape_size().total_cmp(&b.spec.shape_size()),
        })
        .then_with(|| a.spec.name.cmp(&b.spec.name))
}

/// Size and rank every shape
pub fn rank_candidates(specs: &[InstanceTypeSpec], required: &RequiredResources) -> Vec<SizedCandidate> {
    let preference = ShapePreference::for_required(required);
    let mut sized: Vec<SizedCandidate> = specs.iter().map(|s| size_candidate(s, required)).collect();
    sized.sort_by(|a, b| rank_order(a, b, preference));
    sized
}

/// Engine over an allow-listed slice of the catalog
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    specs: Vec<InstanceTypeSpec>,
    top_n: usize,
}

impl RecommendationEngine {
    /// Restrict `catalog` to `families`. An empty restriction is fatal.
    pub fn new<S: AsRef<str>>(catalog: &InstanceCatalog, families: &[S], top_n: usize) -> Result<Self> {
        Self::from_specs(catalog.restricted_to(families)?, top_n)
    }

    pub fn from_specs(specs: Vec<InstanceTypeSpec>, top_n: usize) -> Result<Self> {
        if specs.is_empty() {
            return Err(SizingError::EmptyCatalog { families: Vec::new() });
        }
        if !(1..=MAX_TOP_N).contains(&top_n) {
            return Err(SizingError::InvalidConfig(format!(
                "top_n must be between 1 and {}, got {}",
                MAX_TOP_N, top_n
            )));
        }
        Ok(Self { specs, top_n })
    }

    pub fn specs(&self) -> &[InstanceTypeSpec] {
        &self.specs
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Top-N ranked candidates, unpriced
    pub fn shortlist(&self, required: &RequiredResources) -> Vec<SizedCandidate> {
        let mut ranked = rank_candidates(&self.specs, required);
        ranked.truncate(self.top_n);
        ranked
    }

    /// Combine a shortlist with quotes keyed by instance type.
    ///
    /// Candidates without a quote are priced as unavailable.
    pub fn assemble(
        &self,
        shortlist: Vec<SizedCandidate>,
        quotes: &HashMap<String, PricingQuote>,
        region: &str,
    ) -> Result<Recommendation> {
        let alternatives: Vec<RecommendationCandidate> = shortlist
            .into_iter()
            .map(|candidate| {
                let quote = quotes
                    .get(&candidate.spec.name)
                    .cloned()
                    .unwrap_or_else(|| PricingQuote::unavailable(&candidate.spec.name, region));
                candidate.priced(quote)
            })
            .collect();

        let recommended = alternatives
            .first()
            .cloned()
            .ok_or(SizingError::EmptyCatalog { families: Vec::new() })?;

        Ok(Recommendation {
            recommended,
            alternatives,
        })
    }
}
