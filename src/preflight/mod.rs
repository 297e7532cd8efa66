//! Preflight checks, run after validation and before anything destructive.
//!
//! Run with `archstrap preflight deploy|configure` to check a host without
//! touching it.

mod environment;
mod host_tools;
mod types;

use std::path::Path;

use crate::error::ValidationError;
use crate::spec::DeploySpec;

pub use environment::{mount_check, mounted_on};
pub use host_tools::{CONFIGURE_TOOLS, DEPLOY_TOOLS};
pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Checks for Stage 1 on the live host.
pub fn deploy_checks(spec: &DeploySpec, target: &Path) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking privileges...");
    checks.push(environment::check_root());

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools(DEPLOY_TOOLS));

    println!("Checking target...");
    checks.push(environment::check_target_dir(target));
    checks.push(environment::check_not_mounted(spec.drive()));

    println!();

    PreflightReport { checks }
}

/// Checks for Stage 2 inside the new root.
pub fn configure_checks() -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking privileges...");
    checks.push(environment::check_root());

    println!("Checking tools...");
    checks.extend(host_tools::check_host_tools(CONFIGURE_TOOLS));

    println!();

    PreflightReport { checks }
}

/// Print the report and turn any failure into a validation error.
pub fn require(report: &PreflightReport) -> Result<(), ValidationError> {
    report.print();

    if !report.all_passed() {
        return Err(ValidationError::Preflight(format!(
            "{} check(s) failed: {}",
            report.fail_count(),
            report.failures()
        )));
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
