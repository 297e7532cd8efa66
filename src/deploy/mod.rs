//! Stage 1: wipe the drive, lay out btrfs, bootstrap the base system.
//!
//! Steps run strictly in order and the first failure stops everything:
//! 0. (optional) sync the host package databases
//! 1. GPT label, ESP and btrfs partitions, filesystems
//! 2. Create subvolumes on the raw tree
//! 3. Mount the subvolume layout at the target
//! 4. pacstrap each package
//! 5. genfstab into the new root
//! 6. Stage the second-stage executable
//!
//! There is no resume. A run that stops halfway leaves the disk partially
//! provisioned, and running again starts over from the GPT label, destroying
//! whatever the first run wrote.

pub mod bootstrap;
pub mod disk;
pub mod subvolumes;

use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::{self, run, Step};
use crate::process::{Cmd, CommandRunner};
use crate::spec::{validate_deployer, DeploySpec, DeviceProbe, RawConfig};

/// Where and how Stage 1 runs.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Staging mountpoint for the new root.
    pub target: PathBuf,
    /// Executable copied into the new root for Stage 2.
    pub stage2_binary: PathBuf,
    /// File name of the staged executable inside the new root.
    pub installer_name: String,
    /// Configuration file staged next to the executable, if any.
    pub config_file: Option<PathBuf>,
    /// Run `pacman -Syy` before touching the disk.
    pub sync_db: bool,
}

/// The complete, ordered Stage 1 plan.
pub fn plan(spec: &DeploySpec, opts: &DeployOptions) -> Vec<Step> {
    let mut steps = Vec::new();

    if opts.sync_db {
        steps.push(Step::new(
            "Syncing package databases",
            vec![run(Cmd::new("pacman").arg("-Syy"))],
        ));
    }

    steps.push(disk::partition_step(spec));
    steps.push(subvolumes::create_step(spec, &opts.target));
    steps.push(subvolumes::mount_step(spec, &opts.target));
    steps.push(bootstrap::packages_step(spec, &opts.target));
    steps.push(bootstrap::fstab_step(&opts.target));
    steps.push(bootstrap::handoff_step(
        &opts.stage2_binary,
        &opts.installer_name,
        opts.config_file.as_deref(),
    ));

    steps
}

/// Run Stage 1 for an already validated spec.
pub fn run_deploy(
    spec: &DeploySpec,
    opts: &DeployOptions,
    runner: &mut dyn CommandRunner,
) -> Result<()> {
    log::info!(
        "Deploying {} onto {} (target {})",
        spec.hostname(),
        spec.drive().display(),
        opts.target.display()
    );
    pipeline::execute_all(&opts.target, runner, &plan(spec, opts))?;
    log::info!("Stage 1 complete");
    Ok(())
}

/// Validate the `deployer` section, then run Stage 1.
///
/// Validation fails before the runner sees a single command.
pub fn provision(
    config: RawConfig,
    probe: &dyn DeviceProbe,
    opts: &DeployOptions,
    runner: &mut dyn CommandRunner,
) -> Result<DeploySpec> {
    let spec = validate_deployer(config.deployer, probe)?;
    run_deploy(&spec, opts, runner)?;
    Ok(spec)
}

/// The command the operator runs next to start Stage 2.
pub fn chroot_hint(opts: &DeployOptions) -> String {
    let config = match opts.config_file {
        Some(_) => format!("/{}", bootstrap::staged_config_name(&opts.installer_name)),
        None => "<config.yaml>".to_string(),
    };
    format!(
        "arch-chroot {} /{} configure -f {}",
        opts.target.display(),
        opts.installer_name,
        config
    )
}
