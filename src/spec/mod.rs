//! Validated, immutable provisioning specifications.
//!
//! A spec can only be obtained from the validator, so holding one proves
//! validation passed. Pipelines take specs by reference and never mutate them.
//!
//! The configuration file has one section per stage with different required
//! fields, so there is one spec type per stage: [`DeploySpec`] for the disk
//! and bootstrap stage, [`InstallSpec`] for the chrooted configuration stage.

pub mod source;
pub mod validate;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

pub use source::{RawConfig, RawDeployer, RawInstaller, RawService};
pub use validate::{
    partition_path, validate_deployer, validate_installer, BlockDevices, DeviceProbe,
    NAME_PATTERN,
};

/// Stage 1 input: which disk to wipe and what to put on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySpec {
    hostname: String,
    drive: PathBuf,
    boot_partition: PathBuf,
    os_partition: PathBuf,
    packages: Vec<String>,
}

impl DeploySpec {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn drive(&self) -> &Path {
        &self.drive
    }

    pub fn boot_partition(&self) -> &Path {
        &self.boot_partition
    }

    pub fn os_partition(&self) -> &Path {
        &self.os_partition
    }

    /// Packages to bootstrap, in order. Never empty.
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

/// Stage 2 input: identity, credentials, packages and services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSpec {
    hostname: String,
    username: String,
    #[serde(serialize_with = "redact")]
    credential: Credential,
    drive: PathBuf,
    boot_partition: PathBuf,
    timezone: String,
    packages: Vec<String>,
    services: Vec<ServiceUnit>,
}

impl InstallSpec {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn drive(&self) -> &Path {
        &self.drive
    }

    pub fn boot_partition(&self) -> &Path {
        &self.boot_partition
    }

    /// Zone name relative to `/usr/share/zoneinfo`.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn services(&self) -> &[ServiceUnit] {
        &self.services
    }

    /// Home directory of the primary user, relative to the root.
    pub fn home_dir(&self) -> PathBuf {
        Path::new("home").join(&self.username)
    }
}

/// A login credential as given in the configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A crypt(3) hash, handed to `useradd -p` as is.
    Hashed(String),
    /// A plaintext password, set through `chpasswd`.
    Plain(String),
}

impl Credential {
    /// Classify a configured password value.
    pub fn from_config(value: String) -> Self {
        if is_crypt_hash(&value) {
            Credential::Hashed(value)
        } else {
            Credential::Plain(value)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Hashed(_) => "hashed",
            Credential::Plain(_) => "plaintext",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<redacted>)", self.kind())
    }
}

fn redact<S: Serializer>(credential: &Credential, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("<{} credential>", credential.kind()))
}

/// `$id$...` with a known crypt(3) scheme identifier.
fn is_crypt_hash(value: &str) -> bool {
    const SCHEMES: &[&str] = &["1", "2a", "2b", "2y", "5", "6", "7", "y", "gy", "sha1", "md5"];
    let Some(rest) = value.strip_prefix('$') else {
        return false;
    };
    match rest.split_once('$') {
        Some((id, tail)) => SCHEMES.contains(&id) && !tail.is_empty(),
        None => false,
    }
}

/// A systemd unit to enable, optionally provided by a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUnit {
    pub package: Option<String>,
    pub unit: String,
}
