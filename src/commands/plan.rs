//! Plan command - print a stage's steps without running anything.

use std::path::Path;

use anyhow::Result;

use super::deploy::deploy_options;
use super::{Source, Stage};
use crate::config::Settings;
use crate::deploy;
use crate::install::{self, InstallOptions};
use crate::pipeline::Step;
use crate::spec::{validate_deployer, validate_installer, BlockDevices};

/// Execute the plan command.
pub fn cmd_plan(stage: Stage, source: &Source, settings: &Settings, sync_db: bool) -> Result<()> {
    let raw = source.load()?;

    match stage {
        Stage::Deploy => {
            let spec = validate_deployer(raw.deployer, &BlockDevices)?;
            let opts = deploy_options(source, settings, sync_db)?;
            settings.print();
            println!();
            print_plan(&opts.target, &deploy::plan(&spec, &opts));
            println!("Then: {}", deploy::chroot_hint(&opts));
        }
        Stage::Configure => {
            let spec = validate_installer(raw.installer, &BlockDevices)?;
            print_plan(&InstallOptions::default().root, &install::plan(&spec));
        }
    }
    Ok(())
}

fn print_plan(root: &Path, steps: &[Step]) {
    let total = steps.len();
    for (i, step) in steps.iter().enumerate() {
        println!("[{}/{}] {}", i + 1, total, step.name);
        for op in &step.ops {
            println!("    {}", op.describe(root));
        }
    }
    println!();
}
