//! Sizing run orchestration
//!
//! Enumerates workloads and node groups concurrently, runs the engine,
//! then prices the shortlisted candidates with bounded concurrency. The
//! whole run shares one deadline: enumeration past the deadline is fatal,
//! pricing past the deadline degrades to `unavailable` quotes.

use crate::aggregator::{self, Aggregation, WorkloadSource};
use crate::capacity::{self, NodeGroupSource};
use crate::catalog::InstanceCatalog;
use crate::config::SizingConfig;
use crate::engine::{RecommendationEngine, SizedCandidate};
use crate::error::{Result, SizingError};
use crate::models::{ClusterCapacity, PricingQuote, RequiredResources};
use crate::observability::StructuredLogger;
use crate::pricing::PricingResolver;
use crate::report::{self, CapacityReport, SizingReport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A configured sizing run
pub struct Analyzer {
    config: SizingConfig,
    catalog: InstanceCatalog,
    workloads: Arc<dyn WorkloadSource>,
    node_groups: Arc<dyn NodeGroupSource>,
    resolver: PricingResolver,
    logger: StructuredLogger,
    detailed: bool,
}

/// Builder for [`Analyzer`]
#[derive(Default)]
pub struct AnalyzerBuilder {
    config: Option<SizingConfig>,
    catalog: Option<InstanceCatalog>,
    workloads: Option<Arc<dyn WorkloadSource>>,
    node_groups: Option<Arc<dyn NodeGroupSource>>,
    resolver: Option<PricingResolver>,
    logger: Option<StructuredLogger>,
    detailed: bool,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SizingConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn catalog(mut self, catalog: InstanceCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn workload_source(mut self, source: Arc<dyn WorkloadSource>) -> Self {
        self.workloads = Some(source);
        self
    }

    pub fn node_group_source(mut self, source: Arc<dyn NodeGroupSource>) -> Self {
        self.node_groups = Some(source);
        self
    }

    pub fn pricing(mut self, resolver: PricingResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Include per-workload usage in reports
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    pub fn build(self) -> Result<Analyzer> {
        let workloads = self
            .workloads
            .ok_or_else(|| SizingError::InvalidConfig("workload source not set".to_string()))?;
        let node_groups = self
            .node_groups
            .ok_or_else(|| SizingError::InvalidConfig("node group source not set".to_string()))?;
        let logger = self.logger.unwrap_or_default();

        Ok(Analyzer {
            config: self.config.unwrap_or_default(),
            catalog: self.catalog.unwrap_or_default(),
            workloads,
            node_groups,
            resolver: self
                .resolver
                .unwrap_or_else(|| PricingResolver::new(logger.clone())),
            logger,
            detailed: self.detailed,
        })
    }
}

impl Analyzer {
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Run the full sizing pipeline
    pub async fn run(&self) -> Result<SizingReport> {
        self.config.validate()?;
        // An empty allow-list slice is fatal before any cluster call is made
        let engine = RecommendationEngine::new(
            &self.catalog,
            &self.config.allowed_families,
            self.config.top_n,
        )?;
        let deadline = Instant::now() + self.config.timeout();

        self.logger.log_run_started(
            &self.config.region,
            self.config.headroom_fraction,
            &self.config.allowed_families,
        );

        let (aggregation, capacity) = self.collect_inputs(deadline).await?;
        let required = RequiredResources::from_requested(
            &aggregation.totals.requested,
            self.config.headroom_fraction,
        );
        debug!(
            required_cpu_cores = required.cpu_cores,
            required_memory_gib = required.memory_gib,
            "Computed headroom-adjusted requirement"
        );

        let shortlist = engine.shortlist(&required);
        let quotes = self.price(&shortlist, deadline).await;
        let recommendation = engine.assemble(shortlist, &quotes, &self.config.region)?;

        self.logger
            .log_recommendation(&recommendation.recommended, recommendation.alternatives.len());

        Ok(report::assemble(
            self.logger.cluster(),
            &self.config.region,
            aggregation,
            capacity,
            required,
            recommendation,
            self.detailed,
        ))
    }

    /// Demand and current capacity only, no recommendation or pricing
    pub async fn inspect(&self) -> Result<CapacityReport> {
        self.config.validate()?;
        let deadline = Instant::now() + self.config.timeout();
        let (aggregation, capacity) = self.collect_inputs(deadline).await?;

        Ok(report::assemble_capacity(
            self.logger.cluster(),
            aggregation,
            capacity,
            self.config.headroom_fraction,
            self.detailed,
        ))
    }

    /// Enumerate workloads and node groups concurrently; both must succeed
    async fn collect_inputs(&self, deadline: Instant) -> Result<(Aggregation, ClusterCapacity)> {
        let workloads = aggregator::collect(self.workloads.as_ref());
        let node_groups = capacity::collect(self.node_groups.as_ref(), &self.catalog);

        let (aggregation, capacity) =
            tokio::time::timeout_at(deadline, async { tokio::try_join!(workloads, node_groups) })
                .await
                .map_err(|_| SizingError::Timeout {
                    stage: "cluster enumeration",
                })??;

        self.logger.log_aggregation(
            &aggregation.totals,
            aggregation.zero_request_workloads.len(),
            aggregation.daemonset_count,
        );
        self.logger.log_capacity(&capacity);

        Ok((aggregation, capacity))
    }

    /// Price shortlisted candidates, at most `pricing_concurrency` at a time.
    ///
    /// Lookups still running at the deadline are abandoned; their candidates
    /// are missing from the returned map.
    async fn price(
        &self,
        shortlist: &[SizedCandidate],
        deadline: Instant,
    ) -> HashMap<String, PricingQuote> {
        let semaphore = Arc::new(Semaphore::new(self.config.pricing_concurrency));
        let mut tasks = JoinSet::new();

        for candidate in shortlist {
            let instance_type = candidate.spec.name.clone();
            let region = self.config.region.clone();
            let resolver = self.resolver.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(resolver.resolve(&instance_type, &region).await)
            });
        }

        let mut quotes = HashMap::with_capacity(shortlist.len());
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(Some(quote)))) => {
                    quotes.insert(quote.instance_type.clone(), quote);
                }
                Ok(Some(Ok(None))) => {}
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Pricing task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        if timed_out {
            for candidate in shortlist {
                if !quotes.contains_key(&candidate.spec.name) {
                    self.logger
                        .log_pricing_timed_out(&candidate.spec.name, &self.config.region);
                }
            }
        }

        quotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StaticWorkloads;
    use crate::capacity::StaticNodeGroups;
    use crate::models::{NodeGroup, PricingSource, WorkloadDescriptor};
    use crate::pricing::PriceSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowSource {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn hourly_price(&self, _instance_type: &str, _region: &str) -> anyhow::Result<f64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(0.1)
        }
    }

    fn slow_source(delay: Duration) -> Arc<SlowSource> {
        Arc::new(SlowSource {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn analyzer(config: SizingConfig, resolver: PricingResolver) -> Analyzer {
        Analyzer::builder()
            .config(config)
            .workload_source(Arc::new(StaticWorkloads(Vec::<WorkloadDescriptor>::new())))
            .node_group_source(Arc::new(StaticNodeGroups(vec![NodeGroup {
                name: "default".to_string(),
                instance_type: "m5.large".to_string(),
                current_nodes: 3,
                desired_capacity: 3,
                min_size: 3,
                max_size: 6,
            }])))
            .pricing(resolver)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_pricing_concurrency_is_bounded() {
        let source = slow_source(Duration::from_millis(20));
        let config = SizingConfig {
            pricing_concurrency: 2,
            ..Default::default()
        };
        let report = analyzer(config, PricingResolver::default().with_community(source.clone()))
            .run()
            .await
            .unwrap();

        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert!(report
            .recommendation
            .alternatives
            .iter()
            .all(|c| c.pricing.source == PricingSource::Community));
        assert!(!report.degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_degrades_pricing() {
        let config = SizingConfig {
            timeout_secs: 1,
            ..Default::default()
        };
        let resolver =
            PricingResolver::default().with_community(slow_source(Duration::from_secs(30)));

        let report = analyzer(config, resolver).run().await.unwrap();

        assert_eq!(report.recommendation.alternatives.len(), 5);
        assert!(report
            .recommendation
            .alternatives
            .iter()
            .all(|c| c.pricing.source == PricingSource::Unavailable && c.hourly_cost == 0.0));
        assert!(report.degraded);
    }

    #[tokio::test]
    async fn test_builder_requires_sources() {
        let err = Analyzer::builder().build().err().unwrap();
        assert!(matches!(err, SizingError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_inspect_skips_pricing() {
        let source = slow_source(Duration::from_millis(1));
        let report = analyzer(
            SizingConfig::default(),
            PricingResolver::default().with_community(source.clone()),
        )
        .inspect()
        .await
        .unwrap();

        assert_eq!(report.capacity.total_cpu_cores, 6.0);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 0);
    }
}
