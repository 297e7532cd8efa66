//! Raw configuration source.
//!
//! These structs mirror the YAML file one-to-one and accept anything
//! structurally plausible: every field is optional here. Nothing in this
//! module decides what is valid; that is the validator's job.
//!
//! ```yaml
//! deployer:
//!   hostname: arch1
//!   driveName: /dev/sdb
//!   bootPartition: /dev/sdb1
//!   osPartition: /dev/sdb2
//!   packages: [base, linux, vim]
//! installer:
//!   hostname: arch1
//!   username: alice
//!   password: "$y$j9T$..."
//!   driveName: /dev/sdb
//!   bootPartition: /dev/sdb1
//!   packages: [git]
//!   services:
//!     - { name: openssh, service: sshd }
//!     - NetworkManager
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ValidationError;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawConfig {
    pub deployer: Option<RawDeployer>,
    pub installer: Option<RawInstaller>,
}

/// The `deployer` section (Stage 1).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeployer {
    pub hostname: Option<String>,
    pub drive_name: Option<String>,
    pub boot_partition: Option<String>,
    pub os_partition: Option<String>,
    pub packages: Option<Vec<String>>,
}

/// The `installer` section (Stage 2).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstaller {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub drive_name: Option<String>,
    pub boot_partition: Option<String>,
    pub timezone: Option<String>,
    pub packages: Option<Vec<String>>,
    pub services: Option<Vec<RawService>>,
}

/// A service entry: either `{name, service}` or a bare unit name.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawService {
    Unit(String),
    Pair {
        name: Option<String>,
        service: Option<String>,
    },
}

impl RawConfig {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        // An empty document deserializes to unit, not to a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let text = fs::read_to_string(path).map_err(|source| ValidationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

// =============================================================================
// Legacy flag-based invocation
// =============================================================================

/// Normalize a drive given on the command line (`sdb`, `nvme0n1`) to a path.
pub fn legacy_drive(drive: &str) -> String {
    if drive.starts_with('/') {
        drive.to_string()
    } else {
        format!("/dev/{}", drive)
    }
}

/// Normalize a partition given on the command line.
///
/// A full path is kept as is; anything else (`1`, `p1`) is a suffix of the
/// drive path.
pub fn legacy_partition(drive: &str, partition: &str) -> String {
    if partition.starts_with('/') {
        partition.to_string()
    } else {
        format!("{}{}", legacy_drive(drive), partition)
    }
}

impl RawDeployer {
    /// Build the section from legacy flags. Unset flags stay `None` so the
    /// validator reports them exactly like missing YAML fields.
    pub fn from_flags(
        hostname: Option<String>,
        drive: Option<String>,
        boot: Option<String>,
        os: Option<String>,
        packages: Vec<String>,
    ) -> Self {
        let drive_name = drive.as_deref().map(legacy_drive);
        let partition = |p: Option<String>| match (&drive, p) {
            (Some(d), Some(p)) => Some(legacy_partition(d, &p)),
            (None, p) => p,
            (_, None) => None,
        };
        Self {
            hostname,
            boot_partition: partition(boot),
            os_partition: partition(os),
            drive_name,
            packages: (!packages.is_empty()).then_some(packages),
        }
    }
}

impl RawInstaller {
    #[allow(clippy::too_many_arguments)]
    pub fn from_flags(
        hostname: Option<String>,
        username: Option<String>,
        password: Option<String>,
        drive: Option<String>,
        boot: Option<String>,
        timezone: Option<String>,
        packages: Vec<String>,
        services: Vec<String>,
    ) -> Self {
        let boot_partition = match (&drive, boot) {
            (Some(d), Some(b)) => Some(legacy_partition(d, &b)),
            (None, b) => b,
            (_, None) => None,
        };
        Self {
            hostname,
            username,
            password,
            drive_name: drive.as_deref().map(legacy_drive),
            boot_partition,
            timezone,
            packages: (!packages.is_empty()).then_some(packages),
            services: (!services.is_empty())
                .then(|| services.into_iter().map(RawService::from_flag).collect()),
        }
    }
}

impl RawService {
    /// `package:unit` or just `unit`.
    pub fn from_flag(flag: String) -> Self {
        match flag.split_once(':') {
            Some((package, unit)) => RawService::Pair {
                name: Some(package.to_string()),
                service: Some(unit.to_string()),
            },
            None => RawService::Unit(flag),
        }
    }
}
