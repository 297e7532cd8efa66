//! Configure command - Stage 2 inside the new root.

use anyhow::Result;

use super::Source;
use crate::install::{self, InstallOptions};
use crate::preflight;
use crate::process::SystemRunner;
use crate::spec::{validate_installer, BlockDevices};

/// Execute the configure command.
pub fn cmd_configure(source: &Source, skip_preflight: bool) -> Result<()> {
    let raw = source.load()?;
    let spec = validate_installer(raw.installer, &BlockDevices)?;

    if skip_preflight {
        log::warn!("Skipping preflight checks");
    } else {
        preflight::require(&preflight::configure_checks())?;
    }

    install::run_install(&spec, &InstallOptions::default(), &mut SystemRunner)?;

    println!();
    println!("System configured. Exit the chroot, unmount the new root and reboot.");
    Ok(())
}
