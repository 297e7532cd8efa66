//! Declarative pipeline steps.
//!
//! Both stages are described as data: an ordered list of [`Step`]s, each an
//! ordered list of [`Op`]s. The executor is the only place that turns an op
//! into a system mutation, so the plan printed by `archstrap plan` is exactly
//! what `deploy` and `configure` execute.
//!
//! ```text
//! Step "Partitioning /dev/sdb"        →     executor::execute
//! ────────────────────────────              ─────────────────
//!   run(parted mklabel gpt)                 for op in step.ops {
//!   run(parted mkpart EFI ...)                execute_op(root, runner, op)?;
//!   ...                                     }
//! ```
//!
//! Paths inside ops are relative to the root the executor is given (`/mnt`
//! during Stage 1, `/` inside the new system during Stage 2).

pub mod executor;

pub use executor::{execute, execute_all};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::process::Cmd;

/// A named group of operations that succeed or fail together.
#[derive(Debug, Clone)]
pub struct Step {
    /// Human-readable name for logging.
    pub name: String,
    pub ops: Vec<Op>,
}

impl Step {
    pub fn new(name: impl Into<String>, ops: Vec<Op>) -> Self {
        Self {
            name: name.into(),
            ops,
        }
    }

    /// The external commands this step will invoke, in order.
    pub fn commands(&self) -> impl Iterator<Item = &Cmd> {
        self.ops.iter().filter_map(|op| match op {
            Op::Run(cmd) | Op::Capture { cmd, .. } => Some(cmd),
            _ => None,
        })
    }
}

/// A single operation.
///
/// Every operation is required. A failure stops the step and, through the
/// orchestrator, the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    // ─────────────────────────────────────────────────────────────────────
    // External commands
    // ─────────────────────────────────────────────────────────────────────
    /// Run a command, discarding its output.
    Run(Cmd),

    /// Run a command and write its stdout to a file with the given mode.
    Capture { cmd: Cmd, path: PathBuf, mode: u32 },

    // ─────────────────────────────────────────────────────────────────────
    // File operations
    // ─────────────────────────────────────────────────────────────────────
    /// Create a directory (and parents).
    Dir(PathBuf),

    /// Write a file, replacing it, with specific permissions.
    WriteFile {
        path: PathBuf,
        content: String,
        mode: u32,
    },

    /// Append to a file, creating it if missing.
    AppendFile { path: PathBuf, content: String },

    /// Create an empty file if it does not exist.
    Touch(PathBuf),

    /// Create or replace a symlink (link_path, target).
    Symlink { link: PathBuf, target: PathBuf },

    /// Uncomment (or add) entries in a locale.gen style file.
    EnableLocales { path: PathBuf, entries: Vec<String> },

    /// Copy a file from the host into the root and verify the copy.
    StageFile {
        src: PathBuf,
        dest: PathBuf,
        mode: u32,
    },
}

impl Op {
    /// Describe the op as it would apply under `root`.
    pub fn describe(&self, root: &Path) -> String {
        match self {
            Op::Run(cmd) => cmd.to_string(),
            Op::Capture { cmd, path, mode } => {
                format!("{} > {} (mode {:o})", cmd, under(root, path).display(), mode)
            }
            Op::Dir(path) => format!("mkdir {}", under(root, path).display()),
            Op::WriteFile { path, mode, .. } => {
                format!("write {} (mode {:o})", under(root, path).display(), mode)
            }
            Op::AppendFile { path, .. } => format!("append {}", under(root, path).display()),
            Op::Touch(path) => format!("touch {}", under(root, path).display()),
            Op::Symlink { link, target } => format!(
                "symlink {} -> {}",
                under(root, link).display(),
                target.display()
            ),
            Op::EnableLocales { path, entries } => format!(
                "enable locales {} in {}",
                entries.join(", "),
                under(root, path).display()
            ),
            Op::StageFile { src, dest, mode } => format!(
                "copy {} -> {} (mode {:o})",
                src.display(),
                under(root, dest).display(),
                mode
            ),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ops)", self.name, self.ops.len())
    }
}

/// Resolve an op path under `root`, ignoring any leading `/`.
pub fn under(root: &Path, path: &Path) -> PathBuf {
    root.join(path.strip_prefix("/").unwrap_or(path))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions for readable step definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Run a command.
pub fn run(cmd: Cmd) -> Op {
    Op::Run(cmd)
}

/// Run a command and capture stdout into a file.
pub fn capture(cmd: Cmd, path: impl Into<PathBuf>, mode: u32) -> Op {
    Op::Capture {
        cmd,
        path: path.into(),
        mode,
    }
}

/// Create a directory.
pub fn dir(path: impl Into<PathBuf>) -> Op {
    Op::Dir(path.into())
}

/// Write a file with permissions.
pub fn write_file(path: impl Into<PathBuf>, content: impl Into<String>, mode: u32) -> Op {
    Op::WriteFile {
        path: path.into(),
        content: content.into(),
        mode,
    }
}

/// Append to a file.
pub fn append_file(path: impl Into<PathBuf>, content: impl Into<String>) -> Op {
    Op::AppendFile {
        path: path.into(),
        content: content.into(),
    }
}

pub fn touch(path: impl Into<PathBuf>) -> Op {
    Op::Touch(path.into())
}

/// Create a symlink.
pub fn symlink(link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Op {
    Op::Symlink {
        link: link.into(),
        target: target.into(),
    }
}
