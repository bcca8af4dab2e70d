//! Instance catalog listing

use anyhow::Result;
use sizing_lib::{InstanceCatalog, InstanceTypeSpec};
use tabled::Tabled;

use crate::output::{print_json, print_warning, table, OutputFormat};

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Instance Type")]
    name: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "vCPU")]
    vcpu: u32,
    #[tabled(rename = "Memory (GiB)")]
    memory_gib: f64,
    #[tabled(rename = "GiB/vCPU")]
    ratio: String,
}

/// List the built-in catalog, optionally restricted to family prefixes
pub fn run(families: Option<Vec<String>>, format: OutputFormat) -> Result<()> {
    let catalog = InstanceCatalog::builtin();
    let entries: Vec<InstanceTypeSpec> = match &families {
        Some(families) => catalog.filter_families(families),
        None => catalog.entries().to_vec(),
    };

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Table => {
            if entries.is_empty() {
                print_warning("No instance types match the given families");
                return Ok(());
            }

            let count = entries.len();
            let rows: Vec<CatalogRow> = entries
                .into_iter()
                .map(|spec| CatalogRow {
                    ratio: format!("{:.1}", spec.memory_gib / f64::from(spec.vcpu)),
                    name: spec.name,
                    family: spec.family_prefix,
                    vcpu: spec.vcpu,
                    memory_gib: spec.memory_gib,
                })
                .collect();

            println!("{}", table(rows));
            println!("\nTotal: {} instance types", count);
        }
    }

    Ok(())
}
