//! GPT label, ESP and btrfs partition creation.
//!
//! The order is fixed: the ESP must be partition 1 and the btrfs partition
//! must be partition 2, because the configured `bootPartition` and
//! `osPartition` paths refer to those numbers.

use std::path::Path;

use crate::pipeline::{run, Step};
use crate::process::Cmd;
use crate::spec::DeploySpec;

/// ESP start and end.
pub const ESP_START: &str = "1MiB";
pub const ESP_END: &str = "512MiB";

/// Partition number of the ESP once created.
pub const ESP_NUMBER: &str = "1";

fn parted(drive: &Path) -> Cmd {
    Cmd::new("parted").arg("--script").arg_path(drive)
}

/// Partition and format the target drive.
pub fn partition_step(spec: &DeploySpec) -> Step {
    let drive = spec.drive();

    Step::new(
        format!("Partitioning {}", drive.display()),
        vec![
            run(parted(drive)
                .args(["mklabel", "gpt"])
                .error_msg("Writing GPT label failed")),
            run(parted(drive)
                .args(["mkpart", "EFI", "fat32", ESP_START, ESP_END])
                .error_msg("Creating EFI partition failed")),
            run(parted(drive)
                .args(["set", ESP_NUMBER, "esp", "on"])
                .error_msg("Setting ESP flag failed")),
            run(parted(drive)
                .args(["mkpart", "FILESYSTEM", "btrfs", ESP_END, "100%"])
                .error_msg("Creating btrfs partition failed")),
            run(Cmd::new("mkfs.btrfs")
                .arg("-f")
                .arg_path(spec.os_partition())
                .error_msg("Formatting btrfs partition failed")),
            run(Cmd::new("mkfs.fat")
                .arg("-F32")
                .arg_path(spec.boot_partition())
                .error_msg("Formatting EFI partition failed")),
        ],
    )
}
