use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod inspect;
mod propose;
mod run;
mod templates;
mod verify;

pub use config::{BundleFormat, Config};

/// cmmo - Canonical Multiomic Metadata Orchestrator
#[derive(Parser)]
#[command(name = "cmmo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available schema templates
    Templates,

    /// Print a schema template as JSON
    Template {
        /// Template id (e.g., cosmx)
        #[arg(value_name = "ID")]
        id: String,

        /// Template version (e.g., 1.2)
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Parse a metadata sheet and summarize its columns
    Inspect {
        /// Input CSV, TSV or XLSX file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of rows to preview
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },

    /// Propose a draft column mapping for a template
    Propose {
        /// Input CSV, TSV or XLSX file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Template id
        #[arg(short = 't', long)]
        template: String,

        /// Template version
        #[arg(short = 'V', long = "template-version")]
        version: String,

        /// Write the draft mapping JSON here (printed when omitted)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Harmonize, validate and export a metadata sheet
    Run {
        /// Input CSV, TSV or XLSX file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Template id
        #[arg(short = 't', long)]
        template: String,

        /// Template version
        #[arg(short = 'V', long = "template-version")]
        version: String,

        /// Confirmed mapping JSON (field -> column)
        #[arg(short = 'm', long, value_name = "FILE")]
        mapping: PathBuf,

        /// Output bundle path (defaults to <input>.cmmo.zip)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Operator recorded in the manifest
        #[arg(long)]
        operator: Option<String>,

        /// Year used for identifier suggestions without year context
        #[arg(long)]
        reference_year: Option<i32>,

        /// Ruleset version (latest when omitted)
        #[arg(long)]
        ruleset: Option<String>,

        /// Write a plain directory instead of a ZIP archive
        #[arg(long)]
        directory: bool,

        /// Harmonize rows on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Verify the hashes and layout of an exported bundle
    Verify {
        /// Bundle ZIP or directory
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Templates => templates::list(&config),
        Commands::Template { id, version } => templates::show(&config, &id, &version),
        Commands::Inspect { file, rows } => inspect::run(&config, file, rows),
        Commands::Propose {
            file,
            template,
            version,
            output,
        } => propose::run(&config, file, &template, &version, output),
        Commands::Run {
            file,
            template,
            version,
            mapping,
            output,
            operator,
            reference_year,
            ruleset,
            directory,
            sequential,
        } => run::run(
            &config,
            run::RunArgs {
                input: file,
                template,
                version,
                mapping,
                output,
                operator,
                reference_year,
                ruleset,
                directory,
                sequential,
            },
        ),
        Commands::Verify { bundle } => verify::run(bundle),
    }
}
