//! Host tool availability checks.

use super::types::CheckResult;

/// Tools Stage 1 invokes, with the package that provides each.
pub const DEPLOY_TOOLS: &[(&str, &str)] = &[
    ("parted", "parted"),
    ("mkfs.btrfs", "btrfs-progs"),
    ("mkfs.fat", "dosfstools"),
    ("btrfs", "btrfs-progs"),
    ("mount", "util-linux"),
    ("umount", "util-linux"),
    ("mkdir", "coreutils"),
    ("pacstrap", "arch-install-scripts"),
    ("genfstab", "arch-install-scripts"),
];

/// Tools Stage 2 invokes before its own package step installs the rest.
pub const CONFIGURE_TOOLS: &[(&str, &str)] = &[
    ("locale-gen", "glibc"),
    ("useradd", "shadow"),
    ("chpasswd", "shadow"),
    ("usermod", "shadow"),
    ("pacman", "pacman"),
    ("systemctl", "systemd"),
    ("mount", "util-linux"),
    ("chmod", "coreutils"),
    ("chown", "coreutils"),
];

/// Check every tool is on `PATH`.
pub fn check_host_tools(tools: &[(&str, &str)]) -> Vec<CheckResult> {
    tools
        .iter()
        .map(|(tool, package)| check_tool_exists(tool, package))
        .collect()
}

fn check_tool_exists(tool: &str, package: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.to_string_lossy()),
        Err(_) => CheckResult::fail(
            tool,
            &format!("Not found. Install the '{}' package.", package),
        ),
    }
}
