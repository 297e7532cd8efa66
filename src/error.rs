//! Error taxonomy for the provisioning pipeline.
//!
//! Nothing here is recovered locally. Every error propagates to the
//! orchestrator, which stops the pipeline and reports it. The CLI maps the
//! final error onto one of three process outcomes.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A problem with the configuration or the host, found before any
/// destructive command has run.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("configuration has no `{0}` section")]
    MissingSection(&'static str),

    #[error("{section}.{field} is required")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    #[error(
        "{section}.{field}: {value:?} is not a valid name (must match ^[a-z_][a-z0-9_-]*[$]?$)"
    )]
    InvalidName {
        section: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{section}.{field}: {reason}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{section}.{field}: cannot open device {path}: {source}")]
    DeviceUnavailable {
        section: &'static str,
        field: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("preflight failed: {0}")]
    Preflight(String),

    /// The operator did not confirm a destructive run.
    #[error("aborted: {0}")]
    Aborted(String),

    #[error("{} configuration problems:\n{}", .0.len(), render_all(.0))]
    Multiple(Vec<ValidationError>),
}

fn render_all(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ValidationError {
    /// Collapse a list of problems into one error, or `None` if the list is empty.
    pub fn collect(mut errors: Vec<ValidationError>) -> Option<ValidationError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ValidationError::Multiple(errors)),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An external command ran and exited non-zero.
    #[error("{prefix} (exit code {code}){}", stderr_suffix(.stderr))]
    Command {
        prefix: String,
        command: String,
        code: i32,
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A local file operation failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{}", stderr)
    }
}

impl Error {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// The fixed set of process outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ExecutionFailure,
    ValidationFailure,
}

impl Outcome {
    /// Classify an error coming out of the CLI layer.
    pub fn classify(err: &anyhow::Error) -> Outcome {
        for cause in err.chain() {
            if cause.downcast_ref::<ValidationError>().is_some() {
                return Outcome::ValidationFailure;
            }
            if let Some(Error::Validation(_)) = cause.downcast_ref::<Error>() {
                return Outcome::ValidationFailure;
            }
        }
        Outcome::ExecutionFailure
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::ExecutionFailure => 1,
            Outcome::ValidationFailure => 2,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_includes_stderr() {
        let err = Error::Command {
            prefix: "'parted' failed".into(),
            command: "parted --script /dev/sdb mklabel gpt".into(),
            code: 1,
            stderr: "Error: Could not stat device /dev/sdb\n".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Could not stat device"));
    }

    #[test]
    fn command_error_without_stderr_has_no_trailing_colon() {
        let err = Error::Command {
            prefix: "'false' failed".into(),
            command: "false".into(),
            code: 1,
            stderr: "  \n".into(),
        };
        assert_eq!(err.to_string(), "'false' failed (exit code 1)");
    }

    #[test]
    fn collect_single_and_many() {
        assert!(ValidationError::collect(vec![]).is_none());

        let one = ValidationError::collect(vec![ValidationError::MissingSection("deployer")]);
        assert!(matches!(one, Some(ValidationError::MissingSection("deployer"))));

        let many = ValidationError::collect(vec![
            ValidationError::MissingField {
                section: "deployer",
                field: "hostname",
            },
            ValidationError::MissingField {
                section: "deployer",
                field: "driveName",
            },
        ])
        .unwrap();
        let msg = many.to_string();
        assert!(msg.starts_with("2 configuration problems"));
        assert!(msg.contains("deployer.hostname is required"));
        assert!(msg.contains("deployer.driveName is required"));
    }

    #[test]
    fn outcome_classification() {
        let validation: anyhow::Error =
            Error::from(ValidationError::MissingSection("installer")).into();
        assert_eq!(Outcome::classify(&validation), Outcome::ValidationFailure);

        let wrapped = anyhow::Error::from(ValidationError::MissingSection("installer"))
            .context("loading config");
        assert_eq!(Outcome::classify(&wrapped), Outcome::ValidationFailure);

        let exec: anyhow::Error = Error::Command {
            prefix: "x".into(),
            command: "x".into(),
            code: 2,
            stderr: String::new(),
        }
        .into();
        assert_eq!(Outcome::classify(&exec), Outcome::ExecutionFailure);

        let io: anyhow::Error = Error::io(
            "writing",
            "/mnt/etc/fstab",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        )
        .into();
        assert_eq!(Outcome::classify(&io), Outcome::ExecutionFailure);
    }

    #[test]
    fn exit_codes_are_fixed() {
        assert_eq!(Outcome::Success.exit_code(), 0);
        assert_eq!(Outcome::ExecutionFailure.exit_code(), 1);
        assert_eq!(Outcome::ValidationFailure.exit_code(), 2);
    }
}
