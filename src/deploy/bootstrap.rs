//! Base system installation and hand-off into the new root.

use std::path::{Path, PathBuf};

use crate::pipeline::{capture, run, Op, Step};
use crate::process::Cmd;
use crate::spec::DeploySpec;

/// Mount table inside the new root.
pub const FSTAB: &str = "etc/fstab";
pub const FSTAB_MODE: u32 = 0o644;

/// Mode of the staged Stage 2 executable.
pub const INSTALLER_MODE: u32 = 0o755;

/// The staged configuration may hold a password.
pub const CONFIG_MODE: u32 = 0o600;

/// Install each package with its own pacstrap call.
///
/// One failing package stops the run; packages installed before it stay.
pub fn packages_step(spec: &DeploySpec, target: &Path) -> Step {
    let ops = spec
        .packages()
        .iter()
        .map(|package| {
            run(Cmd::new("pacstrap")
                .arg_path(target)
                .arg(package)
                .error_msg(format!("Installing {} failed", package)))
        })
        .collect();

    Step::new(format!("Installing {} packages", spec.packages().len()), ops)
}

/// Generate the new root's fstab from the live mount state.
pub fn fstab_step(target: &Path) -> Step {
    Step::new(
        "Generating fstab",
        vec![capture(
            Cmd::new("genfstab").arg("-U").arg_path(target),
            FSTAB,
            FSTAB_MODE,
        )],
    )
}

/// Copy the Stage 2 executable, and the configuration it will read, into
/// the new root.
pub fn handoff_step(stage2_binary: &Path, installer_name: &str, config: Option<&Path>) -> Step {
    let mut ops = vec![Op::StageFile {
        src: stage2_binary.to_path_buf(),
        dest: PathBuf::from(installer_name),
        mode: INSTALLER_MODE,
    }];
    if let Some(config) = config {
        ops.push(Op::StageFile {
            src: config.to_path_buf(),
            dest: staged_config_name(installer_name).into(),
            mode: CONFIG_MODE,
        });
    }
    Step::new("Staging second-stage installer", ops)
}

/// Name of the configuration copy next to the staged installer.
pub fn staged_config_name(installer_name: &str) -> String {
    format!("{}.yaml", installer_name)
}
