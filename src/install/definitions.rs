//! Fixed Stage 2 content: what every installed system gets regardless of
//! configuration.

/// Entries enabled in `etc/locale.gen`.
pub const LOCALES: &[&str] = &["en_US.UTF-8 UTF-8", "en_US ISO-8859-1"];

pub const LANG: &str = "en_US.UTF-8";

/// Supplementary group of the primary user, and owner group of the mount table.
pub const PRIVILEGED_GROUP: &str = "wheel";

pub const LOGIN_SHELL: &str = "/usr/bin/zsh";

/// Installed after configured and service-provided packages.
pub const BASELINE_PACKAGES: &[&str] = &[
    // Bootloader
    "grub",
    "efibootmgr",
    // Shell
    "zsh",
    "zsh-completions",
    "zsh-autosuggestions",
    "zsh-syntax-highlighting",
    "zsh-theme-powerlevel10k",
    // genfstab and arch-chroot inside the installed system
    "arch-install-scripts",
    "docker",
];

/// Enabled after configured services.
pub const BASELINE_SERVICES: &[&str] = &["docker"];

/// Extra groups the primary user joins once their services are enabled.
pub const BASELINE_GROUPS: &[&str] = &["docker"];

// =============================================================================
// Bootloader
// =============================================================================

/// ESP mountpoint inside the new root.
pub const EFI_DIR: &str = "/boot/efi";
pub const GRUB_TARGET: &str = "x86_64-efi";
pub const GRUB_BOOTLOADER_ID: &str = "GRUB";
pub const GRUB_CONFIG: &str = "/boot/grub/grub.cfg";

// =============================================================================
// Files
// =============================================================================

pub const LOCALE_GEN: &str = "etc/locale.gen";
pub const LOCALE_CONF: &str = "etc/locale.conf";
pub const LOCALTIME: &str = "etc/localtime";
pub const ZONEINFO: &str = "/usr/share/zoneinfo";
pub const HOSTNAME: &str = "etc/hostname";
pub const HOSTS: &str = "etc/hosts";
/// Absolute, because it is handed to chmod/chown.
pub const FSTAB: &str = "/etc/fstab";

/// Mode of every configuration file Stage 2 writes.
pub const CONFIG_FILE_MODE: u32 = 0o644;

pub const HISTFILE: &str = ".histfile";
pub const ZSHRC: &str = ".zshrc";

/// Appended to the primary user's `.zshrc`. `{home}` is the absolute home.
const ZSHRC_TEMPLATE: &str = "\
HISTFILE={home}/.histfile
HISTSIZE=1000
SAVEHIST=1000
bindkey -e
zstyle :compinstall filename '{home}/.zshrc'
autoload -Uz compinit
compinit
source /usr/share/zsh-theme-powerlevel10k/powerlevel10k.zsh-theme
alias ls='ls --color=auto'
";

pub fn zshrc(home: &str) -> String {
    ZSHRC_TEMPLATE.replace("{home}", home)
}

pub fn hosts(hostname: &str) -> String {
    format!(
        "127.0.0.1   localhost\n::1         localhost\n127.0.1.1   {}\n",
        hostname
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zshrc_points_at_users_home() {
        let rc = zshrc("/home/alice");
        assert!(rc.contains("HISTFILE=/home/alice/.histfile\n"));
        assert!(rc.contains("zstyle :compinstall filename '/home/alice/.zshrc'\n"));
        assert!(rc.ends_with("alias ls='ls --color=auto'\n"));
        assert!(!rc.contains("{home}"));
    }

    #[test]
    fn hosts_maps_loopback_and_hostname() {
        let lines: Vec<Vec<String>> = hosts("arch1")
            .lines()
            .map(|l| l.split_whitespace().map(String::from).collect())
            .collect();
        assert_eq!(
            lines,
            vec![
                vec!["127.0.0.1", "localhost"],
                vec!["::1", "localhost"],
                vec!["127.0.1.1", "arch1"],
            ]
        );
    }
}
