//! Log sink: every record goes to stdout and to an append-only log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Env, Target};

use crate::error::{Error, Result};

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Writes everything to stdout and to a file.
pub struct Tee<W: Write> {
    console: W,
    file: File,
}

impl<W: Write> Tee<W> {
    pub fn new(console: W, file: File) -> Self {
        Self { console, file }
    }
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.console.flush()
    }
}

/// Open the log file for appending, creating it if needed.
pub fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io("opening log file", path, e))
}

/// Install the global logger. Fails if the log file cannot be opened.
///
/// `RUST_LOG` sets the filter, `cli_filter` overrides it.
pub fn init(log_file: &Path, cli_filter: Option<&str>) -> Result<()> {
    let file = open_log_file(log_file)?;

    let env = Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = cli_filter {
        builder.parse_filters(filter);
    }
    builder.format_timestamp_secs();
    builder.format(|buf, record| {
        let ts = buf.timestamp();
        writeln!(buf, "[{} {:<5}] {}", ts, record.level(), record.args())
    });
    builder.target(Target::Pipe(Box::new(Tee::new(io::stdout(), file))));
    // Only fails if a logger is already installed.
    let _ = builder.try_init();
    Ok(())
}
