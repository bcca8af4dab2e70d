//! Demand and capacity command

use anyhow::Result;
use sizing_lib::CapacityReport;

use super::recommend::{print_workloads, DemandRow};
use super::Target;
use crate::config::Overrides;
use crate::output::{
    format_pct, print_capacity, print_heading, print_json, print_notices, table, OutputFormat,
};
use crate::ClusterArgs;

/// Print aggregate demand and current capacity, without pricing
pub async fn run(
    target: &Target,
    cluster: &ClusterArgs,
    overrides: Overrides,
    format: OutputFormat,
) -> Result<()> {
    let analyzer = super::analyzer(target, cluster, overrides).await?;
    let report = analyzer.inspect().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &CapacityReport) {
    println!("Cluster: {}", report.cluster);

    print_heading("Demand by kind");
    let mut rows: Vec<DemandRow> = report
        .totals
        .by_kind
        .iter()
        .map(|(kind, totals)| {
            let label = match kind {
                sizing_lib::WorkloadKind::Deployment => "Deployments",
                sizing_lib::WorkloadKind::StatefulSet => "StatefulSets",
                sizing_lib::WorkloadKind::DaemonSet => "DaemonSets",
            };
            DemandRow::new(label, totals.cpu_cores, totals.memory_gib())
        })
        .collect();
    rows.push(DemandRow::new(
        "Requested",
        report.totals.requested.cpu_cores,
        report.totals.requested.memory_gib(),
    ));
    rows.push(DemandRow::new(
        "Limits",
        report.totals.limits.cpu_cores,
        report.totals.limits.memory_gib(),
    ));
    println!("{}", table(rows));
    println!(
        "With {} headroom: {:.2} vCPU, {:.2} GiB",
        format_pct(report.headroom_fraction),
        report.required.cpu_cores,
        report.required.memory_gib
    );

    print_capacity(&report.capacity);
    if let Some(utilization) = &report.current_utilization {
        println!(
            "Requested vs capacity: CPU {}, memory {}",
            format_pct(utilization.cpu_pct),
            format_pct(utilization.memory_pct)
        );
    }

    print_workloads(report.workloads.as_ref());
    print_notices(&report.notices);
}
