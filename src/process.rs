//! External command execution.
//!
//! Every privileged operation in the pipeline goes through a [`CommandRunner`]:
//! one command at a time, synchronously, stdout and stderr captured. A
//! non-zero exit becomes [`Error::Command`] carrying the captured stderr.
//! There are no retries and no timeouts.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{Error, Result};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code, or -1 if terminated by signal.
    pub code: i32,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    fn from_status(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Builder for a single external command.
///
/// Commands are exec'd directly (no shell), so arguments never need quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    /// Indices into `args` that must never be rendered.
    secret_args: Vec<usize>,
    stdin: Option<String>,
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            secret_args: Vec::new(),
            stdin: None,
            error_prefix: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Add an argument that is passed to the process but masked in logs.
    pub fn arg_secret(mut self, arg: impl AsRef<str>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Feed `input` to the process on stdin. Never rendered.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn failure(&self, result: &CommandResult) -> Error {
        Error::Command {
            prefix: self
                .error_prefix
                .clone()
                .unwrap_or_else(|| format!("'{}' failed", self.program)),
            command: self.to_string(),
            code: result.code,
            stderr: result.stderr.clone(),
        }
    }

    /// Turn a finished result into `Err` if the command failed.
    pub fn check(&self, result: CommandResult) -> Result<CommandResult> {
        if result.success() {
            Ok(result)
        } else {
            Err(self.failure(&result))
        }
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&i) {
                f.write_str(" ********")?;
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        if self.stdin.is_some() {
            f.write_str(" <<< ********")?;
        }
        Ok(())
    }
}

/// Something that can execute a [`Cmd`] to completion.
pub trait CommandRunner {
    /// Run the command, blocking until it exits.
    ///
    /// Returns `Err` if the process cannot be started or exits non-zero.
    fn run(&mut self, cmd: &Cmd) -> Result<CommandResult>;
}

/// Runs commands as real host processes.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &Cmd) -> Result<CommandResult> {
        let spawn_err = |source| Error::Spawn {
            command: cmd.to_string(),
            source,
        };

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(spawn_err)?;

        if let Some(input) = &cmd.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).map_err(spawn_err)?;
            }
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        let result = CommandResult::from_status(output.status, &output.stdout, &output.stderr);
        cmd.check(result)
    }
}

/// A recording runner that never spawns anything.
///
/// Used for tests and dry runs: every command is rendered and recorded,
/// stdout can be scripted per program, and a failure can be injected at a
/// given invocation (1-based).
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Vec<Cmd>,
    stdout: HashMap<String, String>,
    fail_at: Option<usize>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `stdout` whenever `program` is invoked.
    pub fn with_stdout(mut self, program: &str, stdout: &str) -> Self {
        self.stdout.insert(program.to_string(), stdout.to_string());
        self
    }

    /// Make the `n`th invocation (1-based) exit with status 1.
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Number of commands invoked so far, including a failed one.
    pub fn count(&self) -> usize {
        self.calls.len()
    }

    pub fn calls(&self) -> &[Cmd] {
        &self.calls
    }

    /// Rendered command lines, in invocation order.
    pub fn lines(&self) -> Vec<String> {
        self.calls.iter().map(|c| c.to_string()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, cmd: &Cmd) -> Result<CommandResult> {
        self.calls.push(cmd.clone());

        if self.fail_at == Some(self.calls.len()) {
            return cmd.check(CommandResult {
                code: 1,
                stdout: String::new(),
                stderr: format!("injected failure at invocation {}", self.calls.len()),
            });
        }

        let stdout = self.stdout.get(&cmd.program).cloned().unwrap_or_default();
        Ok(CommandResult::ok(stdout))
    }
}

// =============================================================================
// Tests
// =============================================================================
