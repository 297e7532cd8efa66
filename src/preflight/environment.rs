//! Host state checks: privileges, target directory, mounted devices.

use std::fs;
use std::path::Path;

use super::types::CheckResult;

pub const MOUNTS: &str = "/proc/self/mounts";

pub fn check_root() -> CheckResult {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        CheckResult::pass("running as root")
    } else {
        CheckResult::fail("running as root", &format!("effective uid is {}", euid))
    }
}

pub fn check_target_dir(target: &Path) -> CheckResult {
    let name = format!("target {}", target.display());
    if target.is_dir() {
        CheckResult::pass(&name)
    } else {
        CheckResult::fail(&name, "does not exist or is not a directory")
    }
}

/// Fail if the drive or any of its partitions is mounted anywhere.
///
/// A mounted partition usually means an earlier run got partway through.
/// Running again would repartition the disk under the live mounts.
pub fn check_not_mounted(drive: &Path) -> CheckResult {
    match fs::read_to_string(MOUNTS) {
        Ok(mounts) => mount_check(drive, &mounts),
        Err(e) => CheckResult::warn(
            &format!("{} not mounted", drive.display()),
            &format!("cannot read {}: {}", MOUNTS, e),
        ),
    }
}

pub fn mount_check(drive: &Path, mounts: &str) -> CheckResult {
    let name = format!("{} not mounted", drive.display());
    let busy = mounted_on(drive, mounts);
    if busy.is_empty() {
        CheckResult::pass(&name)
    } else {
        CheckResult::fail(&name, &busy.join(", "))
    }
}

/// `device on mountpoint` for every mount of the drive or its partitions.
pub fn mounted_on(drive: &Path, mounts: &str) -> Vec<String> {
    let drive = drive.to_string_lossy();
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            Some((fields.next()?, fields.next()?))
        })
        .filter(|(device, _)| belongs_to(device, &drive))
        .map(|(device, mountpoint)| format!("{} on {}", device, mountpoint))
        .collect()
}

/// `/dev/sdb`, `/dev/sdb2` and `/dev/nvme0n1p2` belong to their drives;
/// `/dev/sdb` does not own `/dev/sdba1`.
fn belongs_to(device: &str, drive: &str) -> bool {
    let Some(suffix) = device.strip_prefix(drive) else {
        return false;
    };
    let digits = suffix.strip_prefix('p').unwrap_or(suffix);
    suffix.is_empty() || (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
