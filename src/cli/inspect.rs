use anyhow::{Context, Result};
use std::path::PathBuf;

use cmmo::ingest::parse_file;

use super::Config;

/// Parse a sheet and print its shape with a short preview
pub fn run(config: &Config, file: PathBuf, preview_rows: usize) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let options = config.ingest_options()?;
    let table = parse_file(&file, &options)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    println!("CMMO Sheet Information");
    println!("======================");
    println!("File: {}", file.display());
    println!();

    println!("Format:");
    println!("  Type: {}", table.format());
    if let Some(encoding) = table.encoding() {
        println!("  Encoding: {}", encoding);
    }
    if let Some(delimiter) = table.delimiter() {
        println!("  Delimiter: {:?}", delimiter);
    }
    println!("  Rows: {}", table.row_count());
    println!();

    println!("Columns:");
    for (i, column) in table.columns().iter().enumerate() {
        let filled = table
            .rows()
            .filter(|(_, row)| row.get(i).is_some_and(|v| !v.trim().is_empty()))
            .count();
        println!("  {:3}. {} ({}/{} filled)", i + 1, column, filled, table.row_count());
    }

    if preview_rows > 0 && !table.is_empty() {
        println!();
        println!("Preview:");
        for (row_number, row) in table.rows().take(preview_rows) {
            println!("  {:>4}: {}", row_number, row.join(" | "));
        }
    }

    Ok(())
}
