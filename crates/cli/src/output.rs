//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use sizing_lib::{ClusterCapacity, Notice, PricingSource, Severity};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows with the shared table style
pub fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("\n{}", title.bold());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

pub fn format_cores(cores: f64) -> String {
    format!("{:.2}", cores)
}

pub fn format_gib(gib: f64) -> String {
    format!("{:.2} GiB", gib)
}

/// Format a 0..1 fraction as a percentage
pub fn format_pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Format a USD amount; unpriced amounts render as a dash
pub fn format_usd(amount: f64, source: PricingSource) -> String {
    match source {
        PricingSource::Unavailable => "-".dimmed().to_string(),
        _ => format!("${:.2}", amount),
    }
}

/// Color waste: low is good, high is wasteful
pub fn color_waste(fraction: f64) -> String {
    let formatted = format_pct(fraction);
    if fraction <= 0.15 {
        formatted.green().to_string()
    } else if fraction <= 0.35 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color pricing source based on trust
pub fn color_source(source: PricingSource) -> String {
    let label = source.to_string();
    match source {
        PricingSource::Authoritative => label.green().to_string(),
        PricingSource::Community => label.yellow().to_string(),
        PricingSource::Unavailable => label.red().to_string(),
    }
}

#[derive(Tabled)]
struct NodeGroupRow {
    #[tabled(rename = "Node Group")]
    name: String,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Nodes")]
    current: u32,
    #[tabled(rename = "Desired")]
    desired: u32,
    #[tabled(rename = "Min/Max")]
    bounds: String,
    #[tabled(rename = "Counted")]
    counted: String,
}

/// Print the current capacity section
pub fn print_capacity(capacity: &ClusterCapacity) {
    print_heading("Current capacity");

    let counted = capacity.by_nodegroup.iter().map(|g| (g, true));
    let excluded = capacity.excluded_nodegroups.iter().map(|g| (g, false));
    let rows: Vec<NodeGroupRow> = counted
        .chain(excluded)
        .map(|(g, counted)| NodeGroupRow {
            name: g.name.clone(),
            instance_type: g.instance_type.clone(),
            current: g.current_nodes,
            desired: g.desired_capacity,
            bounds: format!("{}/{}", g.min_size, g.max_size),
            counted: if counted {
                "✓".green().to_string()
            } else {
                "✗".red().to_string()
            },
        })
        .collect();

    if rows.is_empty() {
        print_warning("No node groups found");
    } else {
        println!("{}", table(rows));
    }
    println!(
        "Total: {} vCPU, {}",
        format_cores(capacity.total_cpu_cores),
        format_gib(capacity.total_memory_gib())
    );
}

/// Print notices, degraded ones as warnings
pub fn print_notices(notices: &[Notice]) {
    if notices.is_empty() {
        return;
    }
    print_heading("Notices");
    for notice in notices {
        match notice.severity() {
            Severity::Degraded => print_warning(&notice.message()),
            Severity::Informational => print_info(&notice.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00Gi");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(250), "250m");
        assert_eq!(format_cpu(1500), "1.5");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.1234), "12.3%");
        assert_eq!(format_pct(1.0), "100.0%");
    }

    #[test]
    fn test_format_usd_priced() {
        assert_eq!(format_usd(12.5, PricingSource::Community), "$12.50");
    }
}
