//! Stage 2: configure the freshly bootstrapped system from inside it.
//!
//! Runs inside the changed root (normally via `arch-chroot`), so file
//! operations apply under `/` and commands see the new system. Steps, in
//! order:
//!
//! 1. Enable locales and run `locale-gen`
//! 2. `etc/locale.conf`
//! 3. `etc/localtime`
//! 4. `etc/hostname`
//! 5. `etc/hosts`
//! 6. Primary user and credential
//! 7. Packages (configured, service-provided, baseline)
//! 8. ESP mount and GRUB
//! 9. Services and service groups
//! 10. Mount table permissions for the privileged group
//! 11. Shell dotfiles and home ownership
//!
//! A failing step halts the rest. Whatever earlier steps applied stays.

pub mod definitions;
pub mod software;
pub mod system;
pub mod user;

use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::{self, Step};
use crate::process::CommandRunner;
use crate::spec::{validate_installer, DeviceProbe, InstallSpec, RawConfig};

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Root the file operations apply under. `/` inside the chroot.
    pub root: PathBuf,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

/// The complete, ordered Stage 2 plan.
pub fn plan(spec: &InstallSpec) -> Vec<Step> {
    vec![
        system::locale_step(),
        system::language_step(),
        system::timezone_step(spec),
        system::hostname_step(spec),
        system::hosts_step(spec),
        user::account_step(spec),
        software::packages_step(spec),
        software::bootloader_step(spec),
        software::services_step(spec),
        system::fstab_permissions_step(),
        user::dotfiles_step(spec),
    ]
}

/// Run Stage 2 for an already validated spec.
pub fn run_install(
    spec: &InstallSpec,
    opts: &InstallOptions,
    runner: &mut dyn CommandRunner,
) -> Result<()> {
    log::info!(
        "Configuring {} for user {} ({} credential)",
        spec.hostname(),
        spec.username(),
        spec.credential().kind()
    );
    pipeline::execute_all(&opts.root, runner, &plan(spec))?;
    log::info!("Stage 2 complete");
    Ok(())
}

/// Validate the `installer` section, then run Stage 2.
pub fn provision(
    config: RawConfig,
    probe: &dyn DeviceProbe,
    opts: &InstallOptions,
    runner: &mut dyn CommandRunner,
) -> Result<InstallSpec> {
    let spec = validate_installer(config.installer, probe)?;
    run_install(&spec, opts, runner)?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{RawInstaller, RawService};
    use std::io;
    use std::path::Path;

    struct AnyDevice;

    impl DeviceProbe for AnyDevice {
        fn probe(&self, _: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn spec(password: &str, services: Vec<RawService>) -> InstallSpec {
        validate_installer(
            Some(RawInstaller {
                hostname: Some("arch1".into()),
                username: Some("alice".into()),
                password: Some(password.into()),
                drive_name: Some("/dev/sdb".into()),
                boot_partition: Some("/dev/sdb1".into()),
                timezone: None,
                packages: Some(vec!["git".into(), "docker".into()]),
                services: Some(services),
            }),
            &AnyDevice,
        )
        .unwrap()
    }

    fn lines(step: &Step) -> Vec<String> {
        step.commands().map(|c| c.to_string()).collect()
    }

    #[test]
    fn eleven_steps_in_fixed_order() {
        let names: Vec<String> = plan(&spec("hunter2", vec![]))
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Generating locales",
                "Setting system language",
                "Setting timezone America/New_York",
                "Writing hostname",
                "Writing hosts",
                "Creating user alice",
                "Installing 10 packages",
                "Installing bootloader",
                "Enabling services",
                "Granting mount table access",
                "Configuring shell for alice",
            ]
        );
    }

    #[test]
    fn hashed_credential_goes_to_useradd() {
        let step = user::account_step(&spec("$6$salt$hash", vec![]));
        assert_eq!(
            lines(&step),
            vec!["useradd -m -s /usr/bin/zsh -G wheel -p ******** alice"]
        );
        let useradd = step.commands().next().unwrap();
        assert!(useradd.get_args().iter().any(|a| a == "$6$salt$hash"));
    }

    #[test]
    fn plaintext_credential_goes_to_chpasswd() {
        let step = user::account_step(&spec("hunter2", vec![]));
        assert_eq!(
            lines(&step),
            vec![
                "useradd -m -s /usr/bin/zsh -G wheel alice",
                "chpasswd <<< ********",
            ]
        );
    }

    #[test]
    fn packages_are_ordered_and_deduplicated() {
        let spec = spec(
            "hunter2",
            vec![
                RawService::Pair {
                    name: Some("openssh".into()),
                    service: Some("sshd".into()),
                },
                RawService::Unit("NetworkManager".into()),
            ],
        );
        let packages = software::package_list(&spec);
        assert_eq!(&packages[..3], &["git", "docker", "openssh"]);
        assert_eq!(packages[3], "grub");
        assert_eq!(packages.iter().filter(|p| *p == "docker").count(), 1);

        assert_eq!(
            software::service_list(&spec),
            vec!["sshd", "NetworkManager", "docker"]
        );
    }

    #[test]
    fn bootloader_mounts_esp_before_grub() {
        let step = software::bootloader_step(&spec("hunter2", vec![]));
        assert_eq!(
            lines(&step),
            vec![
                "mount /dev/sdb1 /boot/efi",
                "grub-install --target=x86_64-efi --bootloader-id=GRUB --efi-directory=/boot/efi",
                "grub-mkconfig -o /boot/grub/grub.cfg",
            ]
        );
    }

    #[test]
    fn services_end_with_group_membership() {
        let step = software::services_step(&spec("hunter2", vec![]));
        assert_eq!(
            lines(&step),
            vec!["systemctl enable docker", "usermod -aG docker alice"]
        );
    }
}
