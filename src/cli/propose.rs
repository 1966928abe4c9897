use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use cmmo::ingest::parse_file;
use cmmo::mapping::propose_mapping;

use super::Config;

/// Print advisory mapping candidates and write a draft mapping
pub fn run(
    config: &Config,
    file: PathBuf,
    template_id: &str,
    version: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let registry = config.registry()?;
    let template = registry.get(template_id, version)?;
    let table = parse_file(&file, &config.ingest_options()?)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let proposal = propose_mapping(table.columns(), template);
    info!(
        "{} candidate(s) for {} (threshold {:.2})",
        proposal.candidates.len(),
        template.reference(),
        proposal.threshold
    );

    eprintln!("Proposed mapping for {} (advisory, review before use):", template.reference());
    for candidate in &proposal.candidates {
        eprintln!(
            "  {:<20} <- {:<24} ({:.0}%)",
            candidate.target,
            candidate.source,
            candidate.confidence * 100.0
        );
    }
    for field in &proposal.unmatched_fields {
        let required = template.field(field).is_some_and(|f| f.required);
        eprintln!(
            "  {:<20} <- (unmapped){}",
            field,
            if required { " REQUIRED" } else { "" }
        );
    }
    if !proposal.unmatched_columns.is_empty() {
        eprintln!("Unused columns: {}", proposal.unmatched_columns.join(", "));
    }

    let json = proposal.to_draft().to_json_pretty()?;
    match output {
        Some(path) => {
            std::fs::write(&path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Draft mapping written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
