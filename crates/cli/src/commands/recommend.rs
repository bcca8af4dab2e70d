//! Node pool recommendation command

use anyhow::Result;
use sizing_lib::{RecommendationCandidate, SizingReport, WorkloadResourceUsage};
use tabled::Tabled;

use super::Target;
use crate::config::Overrides;
use crate::output::{
    color_source, color_waste, format_bytes, format_cores, format_cpu, format_gib, format_pct,
    format_usd, print_capacity, print_heading, print_json, print_notices, print_success, table,
    OutputFormat,
};
use crate::ClusterArgs;

/// Row for the candidates table
#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Nodes")]
    nodes: u32,
    #[tabled(rename = "vCPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "CPU Waste")]
    cpu_waste: String,
    #[tabled(rename = "Mem Waste")]
    memory_waste: String,
    #[tabled(rename = "Avg Waste")]
    avg_waste: String,
    #[tabled(rename = "$/hour")]
    hourly: String,
    #[tabled(rename = "$/month")]
    monthly: String,
    #[tabled(rename = "$/year")]
    yearly: String,
    #[tabled(rename = "Price")]
    source: String,
}

impl CandidateRow {
    fn new(rank: usize, c: &RecommendationCandidate) -> Self {
        let source = c.pricing.source;
        Self {
            rank,
            instance_type: c.instance_type.clone(),
            nodes: c.node_count,
            cpu: format_cores(c.total_cpu_cores),
            memory: format_gib(c.total_memory_gib),
            cpu_waste: color_waste(c.cpu_waste_pct),
            memory_waste: color_waste(c.memory_waste_pct),
            avg_waste: color_waste(c.avg_waste_pct),
            hourly: format_usd(c.hourly_cost, source),
            monthly: format_usd(c.monthly_cost, source),
            yearly: format_usd(c.yearly_cost, source),
            source: color_source(source),
        }
    }
}

/// Row for the demand table
#[derive(Tabled)]
pub(crate) struct DemandRow {
    #[tabled(rename = "")]
    label: &'static str,
    #[tabled(rename = "vCPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

impl DemandRow {
    pub(crate) fn new(label: &'static str, cpu_cores: f64, memory_gib: f64) -> Self {
        Self {
            label,
            cpu: format_cores(cpu_cores),
            memory: format_gib(memory_gib),
        }
    }
}

/// Row for the detailed workloads table
#[derive(Tabled)]
pub(crate) struct WorkloadRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Workload")]
    name: String,
    #[tabled(rename = "Replicas")]
    replicas: u32,
    #[tabled(rename = "CPU Req")]
    cpu_request: String,
    #[tabled(rename = "Mem Req")]
    memory_request: String,
    #[tabled(rename = "CPU Lim")]
    cpu_limit: String,
    #[tabled(rename = "Mem Lim")]
    memory_limit: String,
}

impl From<&WorkloadResourceUsage> for WorkloadRow {
    fn from(w: &WorkloadResourceUsage) -> Self {
        Self {
            kind: w.kind.to_string(),
            name: w.qualified_name(),
            replicas: w.effective_replica_count,
            cpu_request: format_cpu(w.cpu_request_millicores),
            memory_request: format_bytes(w.memory_request_bytes),
            cpu_limit: format_cpu(w.cpu_limit_millicores),
            memory_limit: format_bytes(w.memory_limit_bytes),
        }
    }
}

/// Print per-workload usage when present
pub(crate) fn print_workloads(workloads: Option<&Vec<WorkloadResourceUsage>>) {
    if let Some(workloads) = workloads.filter(|w| !w.is_empty()) {
        print_heading("Workloads (per pod)");
        println!("{}", table(workloads.iter().map(WorkloadRow::from).collect()));
    }
}

/// Run a sizing pass and print the recommendation
pub async fn run(
    target: &Target,
    cluster: &ClusterArgs,
    overrides: Overrides,
    format: OutputFormat,
) -> Result<()> {
    let analyzer = super::analyzer(target, cluster, overrides).await?;
    let report = analyzer.run().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &SizingReport) {
    println!(
        "Cluster: {}  Region: {}  Headroom: {}",
        report.cluster,
        report.region,
        format_pct(report.headroom_fraction)
    );

    print_heading("Demand");
    let mut rows = vec![
        DemandRow::new(
            "Requested",
            report.totals.requested.cpu_cores,
            report.totals.requested.memory_gib(),
        ),
        DemandRow::new(
            "Limits",
            report.totals.limits.cpu_cores,
            report.totals.limits.memory_gib(),
        ),
        DemandRow::new("Required", report.required.cpu_cores, report.required.memory_gib),
    ];
    if let Some(utilization) = &report.current_utilization {
        rows.push(DemandRow {
            label: "Utilization",
            cpu: format_pct(utilization.cpu_pct),
            memory: format_pct(utilization.memory_pct),
        });
    }
    println!("{}", table(rows));
    println!("Workloads: {}", report.totals.workload_count);

    print_capacity(&report.capacity);
    print_workloads(report.workloads.as_ref());

    print_heading("Candidates");
    let rows: Vec<CandidateRow> = report
        .recommendation
        .alternatives
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateRow::new(i + 1, c))
        .collect();
    println!("{}", table(rows));

    let best = &report.recommendation.recommended;
    println!();
    print_success(&format!(
        "Recommended: {} x {} ({} vCPU, {}), average waste {}",
        best.node_count,
        best.instance_type,
        format_cores(best.total_cpu_cores),
        format_gib(best.total_memory_gib),
        format_pct(best.avg_waste_pct)
    ));
    if best.pricing.is_available() {
        println!(
            "  Estimated cost: {}/month, {}/year ({} pricing)",
            format_usd(best.monthly_cost, best.pricing.source),
            format_usd(best.yearly_cost, best.pricing.source),
            best.pricing.source
        );
    }

    print_notices(&report.notices);
}
