//! Step executor - interprets [`Op`] variants and performs the actual work.
//!
//! Commands go through the [`CommandRunner`]; file operations act on the
//! filesystem under `root`. The first failing op stops the step. Whatever
//! earlier ops changed stays changed.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{under, Op, Step};
use crate::error::{Error, Result};
use crate::process::CommandRunner;
use crate::timing::Timer;

/// Execute steps in order, stopping at the first failure.
pub fn execute_all(root: &Path, runner: &mut dyn CommandRunner, steps: &[Step]) -> Result<()> {
    let total = steps.len();
    for (i, step) in steps.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, total, step.name);
        execute(root, runner, step)?;
    }
    Ok(())
}

/// Execute all operations of one step.
pub fn execute(root: &Path, runner: &mut dyn CommandRunner, step: &Step) -> Result<()> {
    let timer = Timer::start(&step.name);

    for op in &step.ops {
        if let Err(err) = execute_op(root, runner, op) {
            log::error!("{} failed: {}", step.name, err);
            return Err(err);
        }
    }

    timer.finish();
    Ok(())
}

/// Execute a single operation.
fn execute_op(root: &Path, runner: &mut dyn CommandRunner, op: &Op) -> Result<()> {
    match op {
        Op::Run(cmd) => {
            log::info!("Command: {}", cmd);
            runner.run(cmd)?;
        }

        Op::Capture { cmd, path, mode } => {
            log::info!("Command: {}", cmd);
            let result = runner.run(cmd)?;
            let full_path = under(root, path);
            create_parent(&full_path)?;
            write_with_mode(&full_path, result.stdout.as_bytes(), *mode)?;
        }

        Op::Dir(path) => {
            let full_path = under(root, path);
            fs::create_dir_all(&full_path)
                .map_err(|e| Error::io("creating directory", &full_path, e))?;
        }

        Op::WriteFile {
            path,
            content,
            mode,
        } => {
            let full_path = under(root, path);
            log::info!("Writing {}", full_path.display());
            create_parent(&full_path)?;
            write_with_mode(&full_path, content.as_bytes(), *mode)?;
        }

        Op::AppendFile { path, content } => {
            let full_path = under(root, path);
            log::info!("Appending to {}", full_path.display());
            create_parent(&full_path)?;
            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .mode(0o644)
                .open(&full_path)
                .map_err(|e| Error::io("opening", &full_path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| Error::io("appending to", &full_path, e))?;
        }

        Op::Touch(path) => {
            let full_path = under(root, path);
            create_parent(&full_path)?;
            OpenOptions::new()
                .append(true)
                .create(true)
                .mode(0o644)
                .open(&full_path)
                .map_err(|e| Error::io("creating", &full_path, e))?;
        }

        Op::Symlink { link, target } => {
            let link_path = under(root, link);
            log::info!("Linking {} -> {}", link_path.display(), target.display());
            create_parent(&link_path)?;
            if link_path.symlink_metadata().is_ok() {
                fs::remove_file(&link_path)
                    .map_err(|e| Error::io("removing", &link_path, e))?;
            }
            std::os::unix::fs::symlink(target, &link_path)
                .map_err(|e| Error::io("symlinking", &link_path, e))?;
        }

        Op::EnableLocales { path, entries } => {
            let full_path = under(root, path);
            log::info!("Enabling locales {} in {}", entries.join(", "), full_path.display());
            let current = match fs::read_to_string(&full_path) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(Error::io("reading", &full_path, e)),
            };
            let updated = enable_locales(&current, entries);
            create_parent(&full_path)?;
            write_with_mode(&full_path, updated.as_bytes(), 0o644)?;
        }

        Op::StageFile { src, dest, mode } => {
            let dest_path = under(root, dest);
            log::info!("Copying {} to {}", src.display(), dest_path.display());
            let bytes = fs::read(src).map_err(|e| Error::io("reading", src, e))?;
            create_parent(&dest_path)?;
            write_with_mode(&dest_path, &bytes, *mode)?;

            let written =
                fs::read(&dest_path).map_err(|e| Error::io("reading back", &dest_path, e))?;
            let expected = sha256_hex(&bytes);
            let actual = sha256_hex(&written);
            if expected != actual {
                return Err(Error::io(
                    "verifying",
                    &dest_path,
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("checksum mismatch: expected {}, got {}", expected, actual),
                    ),
                ));
            }
            log::info!("  sha256 {}", actual);
        }
    }

    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("creating directory", parent, e))?;
    }
    Ok(())
}

/// Write `content` and set `mode` explicitly (the umask does not apply).
fn write_with_mode(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::io("writing", path, e))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io("setting permissions on", path, e))?;
    Ok(())
}

/// Uncomment each entry in locale.gen content, appending entries that are
/// not present at all.
pub fn enable_locales(content: &str, entries: &[String]) -> String {
    let mut enabled = vec![false; entries.len()];
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        // Only a single leading '#' directly before the entry; the header
        // examples are indented ("#  en_US.UTF-8 UTF-8") and stay commented.
        let bare = line.strip_prefix('#').unwrap_or(line);
        match entries.iter().position(|e| bare == e.as_str()) {
            Some(idx) => {
                out.push_str(bare);
                enabled[idx] = true;
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }

    for (entry, done) in entries.iter().zip(enabled) {
        if !done {
            out.push_str(entry);
            out.push('\n');
        }
    }
    out
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{append_file, capture, dir, run, symlink, touch, write_file};
    use crate::process::{Cmd, ScriptedRunner};
    use tempfile::TempDir;

    fn locales() -> Vec<String> {
        vec!["en_US.UTF-8 UTF-8".into(), "en_US ISO-8859-1".into()]
    }

    #[test]
    fn enable_locales_uncomments_existing_entries() {
        let content = "# Examples:\n#  en_US.UTF-8 UTF-8\n#en_GB.UTF-8 UTF-8\n\
                       #en_US.UTF-8 UTF-8\n#en_US ISO-8859-1\n";
        let out = enable_locales(content, &locales());
        assert_eq!(
            out,
            "# Examples:\n#  en_US.UTF-8 UTF-8\n#en_GB.UTF-8 UTF-8\n\
             en_US.UTF-8 UTF-8\nen_US ISO-8859-1\n"
        );
    }

    #[test]
    fn enable_locales_appends_missing_entries() {
        let out = enable_locales("#de_DE.UTF-8 UTF-8\n", &locales());
        assert_eq!(out, "#de_DE.UTF-8 UTF-8\nen_US.UTF-8 UTF-8\nen_US ISO-8859-1\n");
    }

    #[test]
    fn enable_locales_leaves_already_enabled_alone() {
        let out = enable_locales("en_US.UTF-8 UTF-8\n", &locales()[..1]);
        assert_eq!(out, "en_US.UTF-8 UTF-8\n");
    }

    #[test]
    fn capture_writes_stdout_with_mode() {
        let tmp = TempDir::new().unwrap();
        let mut runner = ScriptedRunner::new().with_stdout("genfstab", "UUID=1 / btrfs rw 0 0\n");
        let step = Step::new(
            "fstab",
            vec![capture(Cmd::new("genfstab").args(["-U", "/mnt"]), "etc/fstab", 0o644)],
        );

        execute(tmp.path(), &mut runner, &step).unwrap();

        let fstab = tmp.path().join("etc/fstab");
        assert_eq!(fs::read_to_string(&fstab).unwrap(), "UUID=1 / btrfs rw 0 0\n");
        let mode = fs::metadata(&fstab).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn file_ops_apply_under_root() {
        let tmp = TempDir::new().unwrap();
        let mut runner = ScriptedRunner::new();
        let step = Step::new(
            "files",
            vec![
                dir("boot/efi"),
                write_file("etc/hostname", "arch1\n", 0o644),
                append_file("home/alice/.zshrc", "a\n"),
                append_file("home/alice/.zshrc", "b\n"),
                touch("home/alice/.histfile"),
                symlink("etc/localtime", "/usr/share/zoneinfo/UTC"),
                symlink("etc/localtime", "/usr/share/zoneinfo/America/New_York"),
            ],
        );

        execute(tmp.path(), &mut runner, &step).unwrap();

        let root = tmp.path();
        assert!(root.join("boot/efi").is_dir());
        assert_eq!(fs::read_to_string(root.join("etc/hostname")).unwrap(), "arch1\n");
        assert_eq!(fs::read_to_string(root.join("home/alice/.zshrc")).unwrap(), "a\nb\n");
        assert!(root.join("home/alice/.histfile").exists());
        assert_eq!(
            fs::read_link(root.join("etc/localtime")).unwrap(),
            Path::new("/usr/share/zoneinfo/America/New_York")
        );
        assert_eq!(runner.count(), 0);
    }

    #[test]
    fn stops_at_first_failing_op() {
        let tmp = TempDir::new().unwrap();
        let mut runner = ScriptedRunner::new().failing_at(1);
        let step = Step::new(
            "halts",
            vec![
                run(Cmd::new("locale-gen")),
                write_file("etc/locale.conf", "LANG=en_US.UTF-8\n", 0o644),
            ],
        );

        assert!(execute(tmp.path(), &mut runner, &step).is_err());
        assert!(!tmp.path().join("etc/locale.conf").exists());
    }

    #[test]
    fn stage_executable_copies_and_sets_mode() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("archstrap");
        fs::write(&src, b"\x7fELF fake").unwrap();
        let root = tmp.path().join("mnt");

        let step = Step::new(
            "handoff",
            vec![Op::StageFile {
                src: src.clone(),
                dest: "installer".into(),
                mode: 0o755,
            }],
        );
        execute(&root, &mut ScriptedRunner::new(), &step).unwrap();

        let staged = root.join("installer");
        assert_eq!(fs::read(&staged).unwrap(), b"\x7fELF fake");
        let mode = fs::metadata(&staged).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn stage_executable_missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let step = Step::new(
            "handoff",
            vec![Op::StageFile {
                src: tmp.path().join("missing"),
                dest: "installer".into(),
                mode: 0o755,
            }],
        );
        let err = execute(tmp.path(), &mut ScriptedRunner::new(), &step).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
