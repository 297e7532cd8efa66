//! The primary user account and its shell environment.

use std::path::Path;

use super::definitions::{zshrc, HISTFILE, LOGIN_SHELL, PRIVILEGED_GROUP, ZSHRC};
use crate::pipeline::{append_file, run, touch, Step};
use crate::process::Cmd;
use crate::spec::{Credential, InstallSpec};

/// Create the user with home, login shell, privileged group and credential.
///
/// A pre-hashed credential goes to `useradd -p`. A plaintext one is piped to
/// `chpasswd`, which hashes it with the system's configured method.
pub fn account_step(spec: &InstallSpec) -> Step {
    let user = spec.username();
    let mut useradd = Cmd::new("useradd")
        .args(["-m", "-s", LOGIN_SHELL, "-G", PRIVILEGED_GROUP]);
    if let Credential::Hashed(hash) = spec.credential() {
        useradd = useradd.arg("-p").arg_secret(hash);
    }
    let useradd = useradd
        .arg(user)
        .error_msg(format!("Creating user {} failed", user));

    let mut ops = vec![run(useradd)];
    if let Credential::Plain(password) = spec.credential() {
        ops.push(run(Cmd::new("chpasswd")
            .stdin(format!("{}:{}\n", user, password))
            .error_msg(format!("Setting password for {} failed", user))));
    }

    Step::new(format!("Creating user {}", user), ops)
}

/// Shell history and prompt setup, then hand the home back to the user.
pub fn dotfiles_step(spec: &InstallSpec) -> Step {
    let user = spec.username();
    let home = spec.home_dir();
    let absolute_home = Path::new("/").join(&home);

    Step::new(
        format!("Configuring shell for {}", user),
        vec![
            append_file(home.join(ZSHRC), zshrc(&absolute_home.to_string_lossy())),
            touch(home.join(HISTFILE)),
            run(Cmd::new("chown")
                .arg("-R")
                .arg(format!("{}:{}", user, user))
                .arg_path(&absolute_home)),
        ],
    )
}
