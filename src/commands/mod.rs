//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `deploy` - Stage 1 on the live host
//! - `configure` - Stage 2 inside the new root
//! - `plan` - Print what a stage would do
//! - `preflight` - Check the host without touching it
//! - `validate` - Validate the configuration and print it

mod configure;
mod deploy;
mod plan;
mod preflight;
mod validate;

pub use configure::cmd_configure;
pub use deploy::{cmd_deploy, DeployFlags};
pub use plan::cmd_plan;
pub use preflight::cmd_preflight;
pub use validate::cmd_validate;

use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::spec::RawConfig;

/// Which stage a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Deploy,
    Configure,
}

/// Where the provisioning configuration comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A YAML file.
    File(PathBuf),
    /// Legacy command-line flags, already shaped like the file.
    Flags(RawConfig),
}

impl Source {
    pub fn load(&self) -> Result<RawConfig, ValidationError> {
        match self {
            Source::File(path) => {
                log::info!("Loading configuration from {}", path.display());
                RawConfig::load(path)
            }
            Source::Flags(raw) => Ok(raw.clone()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::File(path) => Some(path),
            Source::Flags(_) => None,
        }
    }
}
