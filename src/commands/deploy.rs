//! Deploy command - Stage 1 on the live host.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use super::Source;
use crate::config::Settings;
use crate::deploy::{self, DeployOptions};
use crate::error::ValidationError;
use crate::preflight;
use crate::process::SystemRunner;
use crate::spec::{validate_deployer, BlockDevices, DeploySpec};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployFlags {
    pub sync_db: bool,
    pub skip_preflight: bool,
    /// Skip the interactive confirmation.
    pub yes: bool,
}

/// Execute the deploy command.
pub fn cmd_deploy(source: &Source, settings: &Settings, flags: DeployFlags) -> Result<()> {
    let raw = source.load()?;
    let spec = validate_deployer(raw.deployer, &BlockDevices)?;

    if flags.skip_preflight {
        log::warn!("Skipping preflight checks");
    } else {
        preflight::require(&preflight::deploy_checks(&spec, &settings.target))?;
    }

    if !flags.yes {
        confirm(&spec)?;
    }

    let opts = deploy_options(source, settings, flags.sync_db)?;
    deploy::run_deploy(&spec, &opts, &mut SystemRunner)?;

    println!();
    println!("Base system installed. Continue inside the new root with:");
    println!("  {}", deploy::chroot_hint(&opts));
    Ok(())
}

pub(super) fn deploy_options(
    source: &Source,
    settings: &Settings,
    sync_db: bool,
) -> Result<DeployOptions> {
    let stage2_binary = settings
        .stage2_binary()
        .context("Cannot locate the second-stage executable")?;

    Ok(DeployOptions {
        target: settings.target.clone(),
        stage2_binary,
        installer_name: settings.installer_name.clone(),
        config_file: source.path().map(|p| p.to_path_buf()),
        sync_db,
    })
}

/// Ask the operator to type `yes` before the drive is wiped.
fn confirm(spec: &DeploySpec) -> Result<()> {
    print!(
        "This will ERASE every partition on {}. Type 'yes' to continue: ",
        spec.drive().display()
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if answer.trim() != "yes" {
        return Err(ValidationError::Aborted(format!(
            "{} left untouched",
            spec.drive().display()
        ))
        .into());
    }
    Ok(())
}
