//! Packages, bootloader and services.

use super::definitions::{
    BASELINE_GROUPS, BASELINE_PACKAGES, BASELINE_SERVICES, EFI_DIR, GRUB_BOOTLOADER_ID,
    GRUB_CONFIG, GRUB_TARGET,
};
use crate::pipeline::{dir, run, Step};
use crate::process::Cmd;
use crate::spec::InstallSpec;

/// Configured packages, then packages providing configured services, then
/// the baseline. First occurrence wins.
pub fn package_list(spec: &InstallSpec) -> Vec<String> {
    let mut packages = Vec::new();
    push_unique(&mut packages, spec.packages().iter().map(String::as_str));
    push_unique(
        &mut packages,
        spec.services().iter().filter_map(|s| s.package.as_deref()),
    );
    push_unique(&mut packages, BASELINE_PACKAGES.iter().copied());
    packages
}

/// Configured units, then the baseline units.
pub fn service_list(spec: &InstallSpec) -> Vec<String> {
    let mut units = Vec::new();
    push_unique(&mut units, spec.services().iter().map(|s| s.unit.as_str()));
    push_unique(&mut units, BASELINE_SERVICES.iter().copied());
    units
}

fn push_unique<'a>(out: &mut Vec<String>, items: impl IntoIterator<Item = &'a str>) {
    for item in items {
        if !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
}

/// One `pacman -S` per package, stopping at the first failure.
pub fn packages_step(spec: &InstallSpec) -> Step {
    let packages = package_list(spec);
    let ops = packages
        .iter()
        .map(|package| {
            run(Cmd::new("pacman")
                .args(["-S", "--needed", "--noconfirm"])
                .arg(package)
                .error_msg(format!("Installing {} failed", package)))
        })
        .collect();

    Step::new(format!("Installing {} packages", packages.len()), ops)
}

/// Mount the ESP, install GRUB onto it, then generate its configuration.
pub fn bootloader_step(spec: &InstallSpec) -> Step {
    Step::new(
        "Installing bootloader",
        vec![
            dir(EFI_DIR),
            run(Cmd::new("mount")
                .arg_path(spec.boot_partition())
                .arg(EFI_DIR)
                .error_msg("Mounting the EFI system partition failed")),
            run(Cmd::new("grub-install")
                .arg(format!("--target={}", GRUB_TARGET))
                .arg(format!("--bootloader-id={}", GRUB_BOOTLOADER_ID))
                .arg(format!("--efi-directory={}", EFI_DIR))),
            run(Cmd::new("grub-mkconfig").args(["-o", GRUB_CONFIG])),
        ],
    )
}

/// Enable every unit, then add the user to the baseline service groups.
pub fn services_step(spec: &InstallSpec) -> Step {
    let mut ops: Vec<_> = service_list(spec)
        .iter()
        .map(|unit| {
            run(Cmd::new("systemctl")
                .arg("enable")
                .arg(unit)
                .error_msg(format!("Enabling {} failed", unit)))
        })
        .collect();

    for group in BASELINE_GROUPS {
        ops.push(run(Cmd::new("usermod")
            .arg("-aG")
            .arg(group)
            .arg(spec.username())));
    }

    Step::new("Enabling services", ops)
}
