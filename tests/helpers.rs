//! Shared test utilities for archstrap tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use archstrap::deploy::DeployOptions;
use archstrap::install::InstallOptions;
use archstrap::spec::{DeviceProbe, RawConfig, RawDeployer, RawInstaller, RawService};
use tempfile::TempDir;

/// Device probe that accepts exactly the listed paths.
pub struct Known(HashSet<PathBuf>);

impl Known {
    pub fn new(paths: &[&str]) -> Self {
        Self(paths.iter().map(PathBuf::from).collect())
    }

    /// The drive and both partitions of the standard scenario.
    pub fn sdb() -> Self {
        Self::new(&["/dev/sdb", "/dev/sdb1", "/dev/sdb2"])
    }
}

impl DeviceProbe for Known {
    fn probe(&self, path: &Path) -> io::Result<()> {
        if self.0.contains(path) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such device"))
        }
    }
}

/// `{hostname: arch1, driveName: /dev/sdb, bootPartition: /dev/sdb1,
/// osPartition: /dev/sdb2, packages: [vim]}`
pub fn deployer() -> RawDeployer {
    RawDeployer {
        hostname: Some("arch1".into()),
        drive_name: Some("/dev/sdb".into()),
        boot_partition: Some("/dev/sdb1".into()),
        os_partition: Some("/dev/sdb2".into()),
        packages: Some(vec!["vim".into()]),
    }
}

pub fn installer() -> RawInstaller {
    RawInstaller {
        hostname: Some("arch1".into()),
        username: Some("alice".into()),
        password: Some("$6$salt$hash".into()),
        drive_name: Some("/dev/sdb".into()),
        boot_partition: Some("/dev/sdb1".into()),
        timezone: None,
        packages: Some(vec!["git".into()]),
        services: Some(vec![RawService::Pair {
            name: Some("openssh".into()),
            service: Some("sshd".into()),
        }]),
    }
}

pub fn deploy_config(deployer: RawDeployer) -> RawConfig {
    RawConfig {
        deployer: Some(deployer),
        installer: None,
    }
}

pub fn install_config(installer: RawInstaller) -> RawConfig {
    RawConfig {
        deployer: None,
        installer: Some(installer),
    }
}

/// Scratch directories standing in for the staging mountpoint and the host.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Staging mountpoint (Stage 1) or new root (Stage 2)
    pub target: PathBuf,
    /// Fake second-stage executable on the "host"
    pub stage2_binary: PathBuf,
    /// Fake configuration file on the "host"
    pub config_file: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let target = base.join("mnt");
        fs::create_dir_all(&target).expect("Failed to create target dir");

        let stage2_binary = base.join("archstrap");
        fs::write(&stage2_binary, b"\x7fELF archstrap").expect("Failed to create binary");

        let config_file = base.join("arch.yaml");
        fs::write(&config_file, "installer:\n  username: alice\n")
            .expect("Failed to create config");

        Self {
            _temp_dir: temp_dir,
            target,
            stage2_binary,
            config_file,
        }
    }

    pub fn deploy_options(&self) -> DeployOptions {
        DeployOptions {
            target: self.target.clone(),
            stage2_binary: self.stage2_binary.clone(),
            installer_name: "installer".into(),
            config_file: Some(self.config_file.clone()),
            sync_db: false,
        }
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            root: self.target.clone(),
        }
    }

    /// Path under the target root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.target.join(relative)
    }
}

/// Permission bits of a file.
pub fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .unwrap_or_else(|e| panic!("Missing {}: {}", path.display(), e))
        .permissions()
        .mode()
        & 0o777
}
