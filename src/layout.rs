//! The fixed btrfs subvolume layout.
//!
//! Each record pairs a subvolume with the directory it is mounted on. The
//! `@log` and `@cache` subvolumes live under `var/`, so names and directories
//! do not match textually. Existing systems depend on exactly this mapping.

/// Mount options applied to every subvolume after creation.
pub const MOUNT_OPTIONS: &str = "noatime,compress=zstd,commit=120";

/// One subvolume and where it is mounted, relative to the tree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subvolume {
    pub name: &'static str,
    /// Empty for the top-level subvolume, which is mounted at the tree root.
    pub mount_dir: &'static str,
    pub options: &'static str,
}

impl Subvolume {
    const fn new(name: &'static str, mount_dir: &'static str) -> Self {
        Self {
            name,
            mount_dir,
            options: MOUNT_OPTIONS,
        }
    }

    pub fn is_root(&self) -> bool {
        self.mount_dir.is_empty()
    }

    /// Full option string for `mount -o`, selecting this subvolume.
    pub fn mount_options(&self) -> String {
        format!("{},subvol={}", self.options, self.name)
    }
}

/// The root subvolume followed by the six nested ones, in mount order.
pub static SUBVOLUME_LAYOUT: [Subvolume; 7] = [
    Subvolume::new("@", ""),
    Subvolume::new("@home", "home"),
    Subvolume::new("@root", "root"),
    Subvolume::new("@srv", "srv"),
    Subvolume::new("@log", "var/log"),
    Subvolume::new("@cache", "var/cache"),
    Subvolume::new("@tmp", "tmp"),
];

/// The top-level subvolume.
pub fn root() -> &'static Subvolume {
    &SUBVOLUME_LAYOUT[0]
}

/// The six subvolumes mounted beneath the root.
pub fn nested() -> &'static [Subvolume] {
    &SUBVOLUME_LAYOUT[1..]
}
