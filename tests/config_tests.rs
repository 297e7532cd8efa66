//! Configuration layers: YAML file, legacy flags, environment settings.

mod helpers;

use std::env;
use std::fs;
use std::path::PathBuf;

use archstrap::config::{Settings, INSTALLER_NAME_VAR, TARGET_VAR};
use archstrap::deploy;
use archstrap::install;
use archstrap::spec::{validate_deployer, validate_installer, RawConfig, RawDeployer, RawInstaller};
use helpers::{Known, TestEnv};
use serial_test::serial;

const CONFIG: &str = r#"
deployer:
  hostname: arch1
  driveName: /dev/sdb
  bootPartition: /dev/sdb1
  osPartition: /dev/sdb2
  packages: [base, linux, vim]
installer:
  hostname: arch1
  username: alice
  password: "$y$j9T$jOPk2UThDe2fZxuc5jOnV1$CEp3s0fbtRNeVzmMJcoYF8ydCHI7Tzjw/pev//gkwOC"
  driveName: /dev/sdb
  bootPartition: /dev/sdb1
  timezone: Europe/Berlin
  services:
    - { name: openssh, service: sshd }
    - NetworkManager
"#;

// =============================================================================
// YAML file
// =============================================================================

#[test]
fn test_yaml_file_drives_both_plans() {
    let env = TestEnv::new();
    let path = env.target.join("arch.yaml");
    fs::write(&path, CONFIG).unwrap();

    let raw = RawConfig::load(&path).expect("config should parse");
    let probe = Known::sdb();

    let deploy_spec = validate_deployer(raw.deployer, &probe).expect("deployer is valid");
    assert_eq!(deploy_spec.packages(), ["base", "linux", "vim"]);
    let steps = deploy::plan(&deploy_spec, &env.deploy_options());
    assert_eq!(steps.len(), 6);

    let install_spec = validate_installer(raw.installer, &probe).expect("installer is valid");
    assert_eq!(install_spec.timezone(), "Europe/Berlin");
    assert_eq!(install_spec.credential().kind(), "hashed");
    let steps = install::plan(&install_spec);
    assert_eq!(steps.len(), 11);
    let services: Vec<String> = steps[8].commands().map(|c| c.to_string()).collect();
    assert_eq!(
        services,
        vec![
            "systemctl enable sshd",
            "systemctl enable NetworkManager",
            "systemctl enable docker",
            "usermod -aG docker alice",
        ]
    );
}

#[test]
fn test_every_problem_is_reported_at_once() {
    let raw = RawConfig::parse(
        "deployer:\n  hostname: Arch1\n  driveName: sdb\n  packages: ['-rf']\n",
    )
    .unwrap();

    let err = validate_deployer(raw.deployer, &Known::sdb()).expect_err("several problems");
    let msg = err.to_string();
    assert!(msg.contains("deployer.hostname"));
    assert!(msg.contains("deployer.driveName"));
    assert!(msg.contains("deployer.bootPartition is required"));
    assert!(msg.contains("deployer.osPartition is required"));
    assert!(msg.contains("deployer.packages"));
}

// =============================================================================
// Legacy flags
// =============================================================================

#[test]
fn test_legacy_flags_match_yaml() {
    let from_flags = RawDeployer::from_flags(
        Some("arch1".into()),
        Some("sdb".into()),
        Some("1".into()),
        Some("2".into()),
        vec!["vim".into()],
    );
    let from_yaml = RawConfig::parse(CONFIG).unwrap().deployer.unwrap();

    let probe = Known::sdb();
    let a = validate_deployer(Some(from_flags), &probe).unwrap();
    let b = validate_deployer(
        Some(RawDeployer {
            packages: Some(vec!["vim".into()]),
            ..from_yaml
        }),
        &probe,
    )
    .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_legacy_services_accept_both_forms() {
    let raw = RawInstaller::from_flags(
        Some("arch1".into()),
        Some("alice".into()),
        Some("hunter2".into()),
        Some("/dev/sdb".into()),
        Some("1".into()),
        None,
        vec![],
        vec!["openssh:sshd".into(), "NetworkManager".into()],
    );
    let spec = validate_installer(Some(raw), &Known::sdb()).unwrap();

    assert_eq!(spec.boot_partition(), PathBuf::from("/dev/sdb1"));
    assert_eq!(spec.services()[0].package.as_deref(), Some("openssh"));
    assert_eq!(spec.services()[0].unit, "sshd");
    assert_eq!(spec.services()[1].package, None);
    assert_eq!(spec.credential().kind(), "plaintext");
}

// =============================================================================
// Environment settings
// =============================================================================

#[test]
#[serial]
fn test_settings_from_environment() {
    env::set_var(TARGET_VAR, "/target");
    env::set_var(INSTALLER_NAME_VAR, "stage2");

    let settings = Settings::load();

    env::remove_var(TARGET_VAR);
    env::remove_var(INSTALLER_NAME_VAR);

    assert_eq!(settings.target, PathBuf::from("/target"));
    assert_eq!(settings.installer_name, "stage2");
}

#[test]
#[serial]
fn test_settings_default_to_running_binary() {
    env::remove_var(TARGET_VAR);
    env::remove_var("ARCHSTRAP_STAGE2_BINARY");

    let settings = Settings::load();

    assert_eq!(settings.target, PathBuf::from("/mnt"));
    assert_eq!(
        settings.stage2_binary().unwrap(),
        env::current_exe().unwrap()
    );
}
