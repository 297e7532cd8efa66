//! Process settings for archstrap.
//!
//! Read from environment variables, with a `.env` file in the working
//! directory loaded first by `main` (real environment variables win).
//! These settings say where and how the tool runs; what it provisions comes
//! from the YAML configuration file.

use std::env;
use std::path::PathBuf;

/// Staging mountpoint for the new root during Stage 1.
pub const DEFAULT_TARGET: &str = "/mnt";
pub const DEFAULT_LOG_FILE: &str = "/tmp/archstrap.log";
/// File name of the Stage 2 executable inside the new root.
pub const DEFAULT_INSTALLER_NAME: &str = "installer";

pub const TARGET_VAR: &str = "ARCHSTRAP_TARGET";
pub const LOG_FILE_VAR: &str = "ARCHSTRAP_LOG_FILE";
pub const INSTALLER_NAME_VAR: &str = "ARCHSTRAP_INSTALLER_NAME";
pub const STAGE2_BINARY_VAR: &str = "ARCHSTRAP_STAGE2_BINARY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub target: PathBuf,
    pub log_file: PathBuf,
    pub installer_name: String,
    /// Executable staged into the new root. `None` means the running binary.
    pub stage2_binary: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            target: get(TARGET_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET)),
            log_file: get(LOG_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            installer_name: get(INSTALLER_NAME_VAR)
                .unwrap_or_else(|| DEFAULT_INSTALLER_NAME.to_string()),
            stage2_binary: get(STAGE2_BINARY_VAR).map(PathBuf::from),
        }
    }

    /// The executable to stage: the override, or this very binary.
    pub fn stage2_binary(&self) -> std::io::Result<PathBuf> {
        match &self.stage2_binary {
            Some(path) => Ok(path.clone()),
            None => env::current_exe(),
        }
    }

    /// Print settings for debugging.
    pub fn print(&self) {
        println!("Settings:");
        println!("  {}: {}", TARGET_VAR, self.target.display());
        println!("  {}: {}", LOG_FILE_VAR, self.log_file.display());
        println!("  {}: {}", INSTALLER_NAME_VAR, self.installer_name);
        match &self.stage2_binary {
            Some(path) => println!("  {}: {}", STAGE2_BINARY_VAR, path.display()),
            None => println!("  {}: (this executable)", STAGE2_BINARY_VAR),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
