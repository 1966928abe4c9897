//! # cmmo
//!
//! Command-line front end for harmonizing laboratory metadata sheets.
//!
//! ## Usage
//!
//! ```bash
//! # Inspect a sheet and draft a mapping
//! cmmo inspect samples.csv
//! cmmo propose samples.csv -t cosmx -V 1.2 -o mapping.json
//!
//! # Harmonize, validate and export
//! cmmo run samples.csv -t cosmx -V 1.2 -m mapping.json --reference-year 2024
//!
//! # Check an exported bundle
//! cmmo verify samples.cmmo.zip
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
