//! Configuration validation.
//!
//! This is the gate in front of every destructive step: a raw section either
//! becomes a complete spec or a [`ValidationError`] naming each problem. No
//! command has run at this point and none will run if validation fails.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::source::{RawDeployer, RawInstaller, RawService};
use super::{Credential, DeploySpec, InstallSpec, ServiceUnit};
use crate::error::ValidationError;

/// Grammar for host and user names.
pub const NAME_PATTERN: &str = r"^[a-z_][a-z0-9_-]*[$]?$";

/// Packages bootstrapped when the deployer section lists none.
pub const DEFAULT_BOOTSTRAP_PACKAGES: &[&str] = &[
    "base",
    "linux",
    "linux-firmware",
    "sudo",
    "vim",
    "python",
    "python-pip",
];

pub const DEFAULT_TIMEZONE: &str = "America/New_York";

const DEPLOYER: &str = "deployer";
const INSTALLER: &str = "installer";

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NAME_PATTERN).expect("NAME_PATTERN is a valid regex"))
}

/// Check a host or user name against [`NAME_PATTERN`].
pub fn is_valid_name(name: &str) -> bool {
    name_regex().is_match(name)
}

/// Partition numbers Stage 1 creates: the ESP first, btrfs second.
pub const BOOT_PARTITION_NUMBER: u32 = 1;
pub const OS_PARTITION_NUMBER: u32 = 2;

/// Kernel device name of partition `number` on `drive`.
///
/// Drives whose name ends in a digit take a `p` separator:
/// `/dev/sdb` gives `/dev/sdb2`, `/dev/nvme0n1` gives `/dev/nvme0n1p2`.
pub fn partition_path(drive: &Path, number: u32) -> PathBuf {
    let drive = drive.to_string_lossy();
    let separator = if drive.ends_with(|c: char| c.is_ascii_digit()) {
        "p"
    } else {
        ""
    };
    PathBuf::from(format!("{}{}{}", drive, separator, number))
}

/// Checks that a device path refers to something that can be opened.
pub trait DeviceProbe {
    fn probe(&self, path: &Path) -> io::Result<()>;
}

/// Probes devices by opening them read-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockDevices;

impl DeviceProbe for BlockDevices {
    fn probe(&self, path: &Path) -> io::Result<()> {
        File::open(path).map(drop)
    }
}

/// Accumulates field problems for one section.
struct Fields<'a> {
    section: &'static str,
    probe: &'a dyn DeviceProbe,
    errors: Vec<ValidationError>,
}

impl<'a> Fields<'a> {
    fn new(section: &'static str, probe: &'a dyn DeviceProbe) -> Self {
        Self {
            section,
            probe,
            errors: Vec::new(),
        }
    }

    fn invalid(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.push(ValidationError::InvalidValue {
            section: self.section,
            field,
            reason: reason.into(),
        });
    }

    /// A present, non-blank value. Missing values are recorded and come back empty.
    fn required(&mut self, field: &'static str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.errors.push(ValidationError::MissingField {
                    section: self.section,
                    field,
                });
                String::new()
            }
        }
    }

    fn name(&mut self, field: &'static str, value: Option<String>) -> String {
        let value = self.required(field, value);
        if !value.is_empty() && !is_valid_name(&value) {
            self.errors.push(ValidationError::InvalidName {
                section: self.section,
                field,
                value: value.clone(),
            });
        }
        value
    }

    fn absolute_path(&mut self, field: &'static str, value: Option<String>) -> PathBuf {
        let value = self.required(field, value);
        if !value.is_empty() && !value.starts_with('/') {
            self.invalid(field, format!("{:?} must be an absolute device path", value));
        }
        PathBuf::from(value)
    }

    /// An absolute path that must also open right now.
    fn device(&mut self, field: &'static str, value: Option<String>) -> PathBuf {
        let path = self.absolute_path(field, value);
        if path.is_absolute() {
            if let Err(source) = self.probe.probe(&path) {
                self.errors.push(ValidationError::DeviceUnavailable {
                    section: self.section,
                    field,
                    path: path.clone(),
                    source,
                });
            }
        }
        path
    }

    /// A package or unit identifier that is safe to pass as a single argument.
    fn identifier(&mut self, field: &'static str, value: &str) -> bool {
        let reason = if value.is_empty() {
            "empty entry"
        } else if value.chars().any(char::is_whitespace) {
            "entries must not contain whitespace"
        } else if value.starts_with('-') {
            "entries must not start with '-'"
        } else {
            return true;
        };
        self.invalid(field, format!("{:?}: {}", value, reason));
        false
    }

    fn packages(&mut self, value: Option<Vec<String>>) -> Vec<String> {
        let packages = value.unwrap_or_default();
        for package in &packages {
            self.identifier("packages", package);
        }
        packages
    }

    fn services(&mut self, value: Option<Vec<RawService>>) -> Vec<ServiceUnit> {
        let mut units = Vec::new();
        for raw in value.unwrap_or_default() {
            let (package, unit) = match raw {
                RawService::Unit(unit) => (None, Some(unit)),
                RawService::Pair { name, service } => (name, service),
            };
            let Some(unit) = unit else {
                self.invalid("services", "every service entry needs a `service` unit name");
                continue;
            };
            let unit_ok = self.identifier("services", &unit);
            let package_ok = package.as_deref().map_or(true, |p| self.identifier("services", p));
            if unit_ok && package_ok {
                units.push(ServiceUnit { package, unit });
            }
        }
        units
    }

    fn timezone(&mut self, value: Option<String>) -> String {
        let zone = value.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let path = Path::new(&zone);
        let relative_and_plain = !zone.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !relative_and_plain {
            self.invalid(
                "timezone",
                format!("{:?} must be a zone name such as Europe/Berlin", zone),
            );
        }
        zone
    }

    /// A plaintext password is fed to `chpasswd` as one `user:password` line.
    fn password(&mut self, value: Option<String>) -> String {
        let password = self.required("password", value);
        if password.contains(['\n', '\r', '\0']) {
            self.invalid("password", "must not contain line breaks or NUL");
        }
        password
    }

    /// The partition must be partition `number` of `drive`, as created by
    /// the partitioning step.
    fn partition_of(
        &mut self,
        field: &'static str,
        partition: &Path,
        drive: &Path,
        number: u32,
    ) {
        if !drive.is_absolute() || !partition.is_absolute() {
            return;
        }
        let expected = partition_path(drive, number);
        if partition != expected {
            self.invalid(
                field,
                format!(
                    "{} is not partition {} of {} (expected {})",
                    partition.display(),
                    number,
                    drive.display(),
                    expected.display()
                ),
            );
        }
    }

    fn finish<T>(self, spec: T) -> Result<T, ValidationError> {
        match ValidationError::collect(self.errors) {
            Some(err) => Err(err),
            None => Ok(spec),
        }
    }
}

/// Validate the Stage 1 section.
///
/// Only the drive is probed. The partitions are created by Stage 1 itself,
/// so they have to name partitions 1 and 2 of that drive.
pub fn validate_deployer(
    raw: Option<RawDeployer>,
    probe: &dyn DeviceProbe,
) -> Result<DeploySpec, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingSection(DEPLOYER))?;
    let mut fields = Fields::new(DEPLOYER, probe);

    let hostname = fields.name("hostname", raw.hostname);
    let drive = fields.device("driveName", raw.drive_name);
    let boot_partition = fields.absolute_path("bootPartition", raw.boot_partition);
    let os_partition = fields.absolute_path("osPartition", raw.os_partition);

    fields.partition_of("bootPartition", &boot_partition, &drive, BOOT_PARTITION_NUMBER);
    fields.partition_of("osPartition", &os_partition, &drive, OS_PARTITION_NUMBER);

    let mut packages = fields.packages(raw.packages);
    if packages.is_empty() {
        packages = DEFAULT_BOOTSTRAP_PACKAGES.iter().map(|p| p.to_string()).collect();
    }

    fields.finish(DeploySpec {
        hostname,
        drive,
        boot_partition,
        os_partition,
        packages,
    })
}

/// Validate the Stage 2 section. Runs inside the new root, where both the
/// drive and the boot partition already exist and are probed.
pub fn validate_installer(
    raw: Option<RawInstaller>,
    probe: &dyn DeviceProbe,
) -> Result<InstallSpec, ValidationError> {
    let raw = raw.ok_or(ValidationError::MissingSection(INSTALLER))?;
    let mut fields = Fields::new(INSTALLER, probe);

    let hostname = fields.name("hostname", raw.hostname);
    let username = fields.name("username", raw.username);
    let password = fields.password(raw.password);
    let drive = fields.device("driveName", raw.drive_name);
    let boot_partition = fields.device("bootPartition", raw.boot_partition);
    let timezone = fields.timezone(raw.timezone);
    let packages = fields.packages(raw.packages);
    let services = fields.services(raw.services);

    fields.finish(InstallSpec {
        hostname,
        username,
        credential: Credential::from_config(password),
        drive,
        boot_partition,
        timezone,
        packages,
        services,
    })
}
