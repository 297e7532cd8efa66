//! btrfs subvolume creation and mounting.
//!
//! Two phases, in this order:
//!
//! 1. Mount the raw top-level tree, create every subvolume beneath it,
//!    unmount.
//! 2. Mount `@` at the target with the tuned options, create the nested
//!    mount points inside it, mount each nested subvolume on its directory.
//!
//! Mounting with `subvol=` before phase 1 has created the subvolumes fails
//! or leaves the tree without them.

use std::path::Path;

use crate::layout::{self, SUBVOLUME_LAYOUT};
use crate::pipeline::{run, Step};
use crate::process::Cmd;
use crate::spec::DeploySpec;

/// Phase 1: create all subvolumes on the raw filesystem.
pub fn create_step(spec: &DeploySpec, target: &Path) -> Step {
    let device = spec.os_partition();
    let mut ops = Vec::with_capacity(SUBVOLUME_LAYOUT.len() + 2);

    ops.push(run(Cmd::new("mount").arg_path(device).arg_path(target)));
    for subvolume in &SUBVOLUME_LAYOUT {
        ops.push(run(Cmd::new("btrfs")
            .args(["subvolume", "create"])
            .arg_path(&target.join(subvolume.name))));
    }
    ops.push(run(Cmd::new("umount").arg_path(target)));

    Step::new(format!("Creating btrfs subvolumes on {}", device.display()), ops)
}

/// Phase 2: mount the layout at `target`.
pub fn mount_step(spec: &DeploySpec, target: &Path) -> Step {
    let device = spec.os_partition();
    let root = layout::root();
    let nested = layout::nested();
    let mut ops = Vec::with_capacity(1 + 2 * nested.len());

    ops.push(run(Cmd::new("mount")
        .arg("-o")
        .arg(root.mount_options())
        .arg_path(device)
        .arg_path(target)));

    for subvolume in nested {
        ops.push(run(Cmd::new("mkdir")
            .arg("-p")
            .arg_path(&target.join(subvolume.mount_dir))));
    }

    for subvolume in nested {
        ops.push(run(Cmd::new("mount")
            .arg("-o")
            .arg(subvolume.mount_options())
            .arg_path(device)
            .arg_path(&target.join(subvolume.mount_dir))));
    }

    Step::new(format!("Mounting btrfs layout at {}", target.display()), ops)
}
