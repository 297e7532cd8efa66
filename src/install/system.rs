//! Locale, clock, identity and mount table permissions.

use std::path::Path;

use super::definitions::{
    hosts, CONFIG_FILE_MODE, FSTAB, HOSTNAME, HOSTS, LANG, LOCALES, LOCALE_CONF, LOCALE_GEN,
    LOCALTIME, PRIVILEGED_GROUP, ZONEINFO,
};
use crate::pipeline::{run, symlink, write_file, Op, Step};
use crate::process::Cmd;
use crate::spec::InstallSpec;

pub fn locale_step() -> Step {
    Step::new(
        "Generating locales",
        vec![
            Op::EnableLocales {
                path: LOCALE_GEN.into(),
                entries: LOCALES.iter().map(|l| l.to_string()).collect(),
            },
            run(Cmd::new("locale-gen").error_msg("Generating locales failed")),
        ],
    )
}

pub fn language_step() -> Step {
    Step::new(
        "Setting system language",
        vec![write_file(
            LOCALE_CONF,
            format!("LANG={}\n", LANG),
            CONFIG_FILE_MODE,
        )],
    )
}

pub fn timezone_step(spec: &InstallSpec) -> Step {
    Step::new(
        format!("Setting timezone {}", spec.timezone()),
        vec![symlink(LOCALTIME, Path::new(ZONEINFO).join(spec.timezone()))],
    )
}

pub fn hostname_step(spec: &InstallSpec) -> Step {
    Step::new(
        "Writing hostname",
        vec![write_file(
            HOSTNAME,
            format!("{}\n", spec.hostname()),
            CONFIG_FILE_MODE,
        )],
    )
}

pub fn hosts_step(spec: &InstallSpec) -> Step {
    Step::new(
        "Writing hosts",
        vec![write_file(HOSTS, hosts(spec.hostname()), CONFIG_FILE_MODE)],
    )
}

/// Let the privileged group edit the mount table.
pub fn fstab_permissions_step() -> Step {
    Step::new(
        "Granting mount table access",
        vec![
            run(Cmd::new("chmod").args(["g+w", FSTAB])),
            run(Cmd::new("chown")
                .arg(format!(":{}", PRIVILEGED_GROUP))
                .arg(FSTAB)),
        ],
    )
}
