//! archstrap - bare-metal Arch Linux provisioner.
//!
//! One binary, two stages:
//! - `deploy` runs on the live host: partitions the drive, builds the btrfs
//!   subvolume layout, pacstraps the base system and stages itself into the
//!   new root
//! - `configure` runs inside the new root (via `arch-chroot`): locale,
//!   identity, user, packages, bootloader, services, dotfiles

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use archstrap::commands::{self, DeployFlags, Source, Stage};
use archstrap::config::Settings;
use archstrap::error::Outcome;
use archstrap::logging;
use archstrap::spec::{RawConfig, RawDeployer, RawInstaller};

#[derive(Parser)]
#[command(name = "archstrap")]
#[command(version, about = "Bare-metal Arch Linux provisioner")]
#[command(
    after_help = "QUICK START:
  archstrap validate -f arch.yaml       Check the configuration
  archstrap plan deploy -f arch.yaml    Show what Stage 1 will run
  archstrap deploy -f arch.yaml         Wipe, partition, bootstrap
  arch-chroot /mnt /installer configure -f /installer.yaml"
)]
struct Cli {
    /// env_logger-style filter (e.g. "debug"); overrides RUST_LOG
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage 1: wipe the drive, lay out btrfs, pacstrap, stage the installer
    Deploy {
        #[command(flatten)]
        source: DeploySource,

        /// Sync the host package databases (pacman -Syy) first
        #[arg(long)]
        sync_db: bool,

        /// Do not run preflight checks
        #[arg(long)]
        skip_preflight: bool,

        /// Do not ask before erasing the drive
        #[arg(short, long)]
        yes: bool,
    },

    /// Stage 2: configure the new system (run inside arch-chroot)
    Configure {
        #[command(flatten)]
        source: InstallSource,

        /// Do not run preflight checks
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Print the steps a stage would run, without running anything
    Plan {
        #[command(subcommand)]
        stage: PlanStage,
    },

    /// Run preflight checks without touching anything
    Preflight {
        #[command(subcommand)]
        stage: PreflightStage,
    },

    /// Validate the configuration and print it as JSON (passwords redacted)
    Validate {
        /// YAML configuration file
        #[arg(short = 'f', long)]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum PlanStage {
    /// Stage 1 plan
    Deploy {
        #[command(flatten)]
        source: DeploySource,

        /// Include the package database sync
        #[arg(long)]
        sync_db: bool,
    },
    /// Stage 2 plan
    Configure {
        #[command(flatten)]
        source: InstallSource,
    },
}

#[derive(Subcommand)]
enum PreflightStage {
    /// Checks for Stage 1 (needs the drive from the configuration)
    Deploy {
        #[command(flatten)]
        source: DeploySource,

        /// Fail if any checks fail (exit code 2)
        #[arg(long)]
        strict: bool,
    },
    /// Checks for Stage 2
    Configure {
        /// Fail if any checks fail (exit code 2)
        #[arg(long)]
        strict: bool,
    },
}

/// The `deployer` section, from a file or from legacy flags.
#[derive(Args)]
struct DeploySource {
    /// YAML configuration file with a `deployer` section
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Legacy: hostname of the new system
    #[arg(long, conflicts_with = "config")]
    hostname: Option<String>,

    /// Legacy: drive to wipe (sdb or /dev/sdb)
    #[arg(long, conflicts_with = "config")]
    drive: Option<String>,

    /// Legacy: EFI partition (1, p1 or a full path)
    #[arg(long, conflicts_with = "config")]
    boot: Option<String>,

    /// Legacy: btrfs partition (2, p2 or a full path)
    #[arg(long, conflicts_with = "config")]
    os: Option<String>,

    /// Legacy: package to pacstrap (repeatable)
    #[arg(long = "package", conflicts_with = "config")]
    packages: Vec<String>,
}

impl DeploySource {
    fn into_source(self) -> Source {
        match self.config {
            Some(path) => Source::File(path),
            None => Source::Flags(RawConfig {
                deployer: Some(RawDeployer::from_flags(
                    self.hostname,
                    self.drive,
                    self.boot,
                    self.os,
                    self.packages,
                )),
                installer: None,
            }),
        }
    }
}

/// The `installer` section, from a file or from legacy flags.
#[derive(Args)]
struct InstallSource {
    /// YAML configuration file with an `installer` section
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Legacy: hostname of the new system
    #[arg(long, conflicts_with = "config")]
    hostname: Option<String>,

    /// Legacy: primary user
    #[arg(long, conflicts_with = "config")]
    username: Option<String>,

    /// Legacy: password, plaintext or crypt(3) hash
    #[arg(long, conflicts_with = "config")]
    password: Option<String>,

    /// Legacy: installed drive (sdb or /dev/sdb)
    #[arg(long, conflicts_with = "config")]
    drive: Option<String>,

    /// Legacy: EFI partition (1, p1 or a full path)
    #[arg(long, conflicts_with = "config")]
    boot: Option<String>,

    /// Legacy: zone name under /usr/share/zoneinfo
    #[arg(long, conflicts_with = "config")]
    timezone: Option<String>,

    /// Legacy: package to install (repeatable)
    #[arg(long = "package", conflicts_with = "config")]
    packages: Vec<String>,

    /// Legacy: service as package:unit or unit (repeatable)
    #[arg(long = "service", conflicts_with = "config")]
    services: Vec<String>,
}

impl InstallSource {
    fn into_source(self) -> Source {
        match self.config {
            Some(path) => Source::File(path),
            None => Source::Flags(RawConfig {
                deployer: None,
                installer: Some(RawInstaller::from_flags(
                    self.hostname,
                    self.username,
                    self.password,
                    self.drive,
                    self.boot,
                    self.timezone,
                    self.packages,
                    self.services,
                )),
            }),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let settings = Settings::load();

    if let Err(err) = logging::init(&settings.log_file, cli.log_filter.as_deref()) {
        eprintln!("Error: {}", err);
        return Outcome::ExecutionFailure.into();
    }

    match run(cli.command, &settings) {
        Ok(()) => Outcome::Success.into(),
        Err(err) => {
            let outcome = Outcome::classify(&err);
            log::error!("{:#}", err);
            outcome.into()
        }
    }
}

fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Deploy {
            source,
            sync_db,
            skip_preflight,
            yes,
        } => {
            let flags = DeployFlags {
                sync_db,
                skip_preflight,
                yes,
            };
            commands::cmd_deploy(&source.into_source(), settings, flags)?;
        }

        Commands::Configure {
            source,
            skip_preflight,
        } => {
            commands::cmd_configure(&source.into_source(), skip_preflight)?;
        }

        Commands::Plan { stage } => match stage {
            PlanStage::Deploy { source, sync_db } => {
                commands::cmd_plan(Stage::Deploy, &source.into_source(), settings, sync_db)?;
            }
            PlanStage::Configure { source } => {
                commands::cmd_plan(Stage::Configure, &source.into_source(), settings, false)?;
            }
        },

        Commands::Preflight { stage } => match stage {
            PreflightStage::Deploy { source, strict } => {
                commands::cmd_preflight(Stage::Deploy, &source.into_source(), settings, strict)?;
            }
            PreflightStage::Configure { strict } => {
                let source = Source::Flags(RawConfig::default());
                commands::cmd_preflight(Stage::Configure, &source, settings, strict)?;
            }
        },

        Commands::Validate { config } => {
            commands::cmd_validate(&Source::File(config))?;
        }
    }

    Ok(())
}
