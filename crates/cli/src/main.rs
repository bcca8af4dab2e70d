//! Kubesize CLI
//!
//! Sizes a node pool for a Kubernetes cluster from the resource requests
//! of its workloads, and reports current capacity and catalog shapes.

mod client;
mod commands;
mod config;
mod eks;
mod output;
mod quantity;
mod snapshot;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{capacity, catalog, recommend};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Kubesize CLI
#[derive(Parser)]
#[command(name = "kubesize")]
#[command(author, version, about = "Node pool sizing for Kubernetes clusters", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// Sizing config file (defaults to ~/.config/kubesize/config.toml)
    #[arg(long, global = true, env = "KUBESIZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a node pool shape and size
    Recommend {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[command(flatten)]
        sizing: SizingArgs,

        /// Allowed instance family prefixes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        families: Option<Vec<String>>,

        /// Number of alternatives to show (1-5)
        #[arg(long)]
        top: Option<usize>,

        /// Region used for pricing
        #[arg(long)]
        region: Option<String>,

        /// Skip pricing lookups; costs are reported as unavailable
        #[arg(long)]
        no_pricing: bool,
    },

    /// Show aggregate demand and current capacity
    Capacity {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[command(flatten)]
        sizing: SizingArgs,
    },

    /// List catalog instance types
    Catalog {
        /// Family prefixes to include (comma-separated); all when omitted
        #[arg(long, value_delimiter = ',')]
        families: Option<Vec<String>>,
    },
}

/// Where workloads and node groups come from
#[derive(Args)]
pub struct ClusterArgs {
    /// Only count workloads in this namespace
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Node group source
    #[arg(long, value_enum, default_value = "nodes")]
    pub nodegroups: NodeGroupMode,

    /// EKS cluster name, required with --nodegroups eks
    #[arg(long, env = "KUBESIZE_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Read workloads and node groups from a JSON snapshot instead of a cluster
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Include per-workload usage
    #[arg(long)]
    pub detailed: bool,
}

/// Demand settings shared by cluster commands
#[derive(Args)]
pub struct SizingArgs {
    /// Headroom fraction added to requests (e.g. 0.2 for 20%)
    #[arg(long)]
    pub headroom: Option<f64>,

    /// Overall deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NodeGroupMode {
    /// Group Kubernetes nodes by their node-group labels
    Nodes,
    /// Describe EKS managed node groups
    Eks,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let target = commands::Target {
        kubeconfig: cli.kubeconfig,
        context: cli.context,
        config: cli.config,
    };

    match cli.command {
        Commands::Recommend {
            cluster,
            sizing,
            families,
            top,
            region,
            no_pricing,
        } => {
            let overrides = config::Overrides {
                headroom: sizing.headroom,
                families,
                top,
                region,
                timeout_secs: sizing.timeout,
                no_pricing,
            };
            recommend::run(&target, &cluster, overrides, cli.format).await?;
        }
        Commands::Capacity { cluster, sizing } => {
            let overrides = config::Overrides {
                headroom: sizing.headroom,
                timeout_secs: sizing.timeout,
                no_pricing: true,
                ..Default::default()
            };
            capacity::run(&target, &cluster, overrides, cli.format).await?;
        }
        Commands::Catalog { families } => {
            catalog::run(families, cli.format)?;
        }
    }

    Ok(())
}
