//! Preflight command - runs preflight checks.

use anyhow::Result;

use super::{Source, Stage};
use crate::config::Settings;
use crate::preflight;
use crate::spec::{validate_deployer, BlockDevices};

/// Execute the preflight command.
///
/// Stage 1 checks need the drive, so the configuration is validated first.
pub fn cmd_preflight(
    stage: Stage,
    source: &Source,
    settings: &Settings,
    strict: bool,
) -> Result<()> {
    let report = match stage {
        Stage::Deploy => {
            let raw = source.load()?;
            let spec = validate_deployer(raw.deployer, &BlockDevices)?;
            preflight::deploy_checks(&spec, &settings.target)
        }
        Stage::Configure => preflight::configure_checks(),
    };

    if strict {
        preflight::require(&report)?;
    } else {
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to fail with a validation error.");
        }
    }
    Ok(())
}
