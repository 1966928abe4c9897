use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use cmmo::export::ManifestMeta;
use cmmo::harmonize::HarmonizeOptions;
use cmmo::mapping::FieldMapping;
use cmmo::pipeline::{Uploaded, Validation};
use cmmo::validator::{Ruleset, ValidationOptions, ValidationReport};

use super::{BundleFormat, Config};

/// Arguments of `cmmo run`
pub struct RunArgs {
    pub input: PathBuf,
    pub template: String,
    pub version: String,
    pub mapping: PathBuf,
    pub output: Option<PathBuf>,
    pub operator: Option<String>,
    pub reference_year: Option<i32>,
    pub ruleset: Option<String>,
    pub directory: bool,
    pub sequential: bool,
}

/// Run a sheet through harmonization, validation and export
pub fn run(config: &Config, args: RunArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let format = if args.directory {
        BundleFormat::Directory
    } else {
        config.export.format.unwrap_or_default()
    };

    let output = args.output.unwrap_or_else(|| {
        let stem = args.input.file_stem().unwrap_or_default().to_string_lossy();
        match format {
            BundleFormat::Zip => args.input.with_file_name(format!("{}.cmmo.zip", stem)),
            BundleFormat::Directory => args.input.with_file_name(format!("{}.cmmo", stem)),
        }
    });

    let registry = config.registry()?;
    let template = registry.get(&args.template, &args.version)?;

    let ruleset_version = args
        .ruleset
        .as_deref()
        .or(config.validation.ruleset_version.as_deref());
    let ruleset = match ruleset_version {
        Some(version) => Ruleset::by_version(version)?,
        None => Ruleset::latest(),
    };

    let mut validation_options = ValidationOptions::default();
    if let Some(year) = args.reference_year.or(config.validation.reference_year) {
        validation_options = validation_options.with_reference_year(year);
    }

    let harmonize_options = if args.sequential {
        HarmonizeOptions::sequential()
    } else {
        HarmonizeOptions::default()
    };

    let mapping_json = std::fs::read_to_string(&args.mapping)
        .with_context(|| format!("Failed to read mapping file: {}", args.mapping.display()))?;
    let mapping = FieldMapping::from_json(&mapping_json)
        .with_context(|| format!("Invalid mapping file: {}", args.mapping.display()))?;

    info!("CMMO Run");
    info!("========");
    info!("Input:    {}", args.input.display());
    info!("Template: {}", template.reference());
    info!("Ruleset:  {}", ruleset.version());
    info!("Output:   {}", output.display());

    let uploaded = Uploaded::from_file(&args.input, &config.ingest_options()?)
        .with_context(|| format!("Failed to ingest {}", args.input.display()))?;
    let run_id = uploaded.run_id();

    let validation = uploaded
        .map(template, mapping)
        .context("Mapping was rejected")?
        .harmonize(&harmonize_options)?
        .validate(&ruleset, &validation_options)?;

    print_report(&validation.report());

    let validated = match validation {
        Validation::Passed(validated) => validated,
        Validation::Blocked(blocked) => {
            warn!(
                "Run {} blocked by {} issue(s); no bundle written",
                run_id,
                blocked.outcome().counts().blockers
            );
            std::process::exit(1);
        }
    };

    let mut meta = ManifestMeta::now();
    if let Some(operator) = args.operator.or_else(|| config.export.operator.clone()) {
        meta = meta.with_operator(operator);
    }

    let bundle = validated.export(meta)?.into_bundle();
    match format {
        BundleFormat::Zip => {
            let size = bundle
                .write_zip(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Bundle size: {} bytes", size);
        }
        BundleFormat::Directory => bundle
            .write_directory(&output)
            .with_context(|| format!("Failed to write {}", output.display()))?,
    }

    println!("Bundle written to {}", output.display());
    println!("  Bundle digest: {}", bundle.manifest().bundle_digest);
    Ok(())
}

fn print_report(report: &ValidationReport) {
    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }
}
