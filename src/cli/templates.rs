use anyhow::{Context, Result};

use super::Config;

/// List registered schema templates
pub fn list(config: &Config) -> Result<()> {
    let registry = config.registry()?;

    println!("{:<12} {:<8} {:<14} {:<16} NAME", "ID", "VERSION", "VENDOR", "CATEGORY");
    for summary in registry.list() {
        println!(
            "{:<12} {:<8} {:<14} {:<16} {}",
            summary.id, summary.version, summary.vendor, summary.category, summary.name
        );
    }
    Ok(())
}

/// Print one template as pretty JSON
pub fn show(config: &Config, id: &str, version: &str) -> Result<()> {
    let registry = config.registry()?;
    let template = registry.get(id, version)?;
    let json = serde_json::to_string_pretty(template)
        .with_context(|| format!("Failed to serialize template {}", template.reference()))?;
    println!("{}", json);
    Ok(())
}
