use anyhow::Result;
use log::info;
use std::path::PathBuf;

use cmmo::export::verify_bundle;

/// Verify an exported bundle
pub fn run(bundle: PathBuf) -> Result<()> {
    info!("CMMO Bundle Verifier");
    info!("====================");
    info!("Bundle: {}", bundle.display());

    match verify_bundle(&bundle) {
        Ok(report) => {
            #[cfg(feature = "colorized_output")]
            {
                println!("{}", report.format_colored());
            }

            #[cfg(not(feature = "colorized_output"))]
            {
                println!("{}", report);
            }

            if report.has_failures() {
                std::process::exit(1);
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Verification error: {}", e);
            std::process::exit(1);
        }
    }
}
