//! Validate command - check the configuration and print the typed result.

use anyhow::Result;
use serde_json::{Map, Value};

use super::Source;
use crate::error::ValidationError;
use crate::spec::{validate_deployer, validate_installer, BlockDevices, RawConfig};

/// Execute the validate command.
///
/// Every section present is validated and problems from both are reported
/// together. Credentials are redacted in the output.
pub fn cmd_validate(source: &Source) -> Result<()> {
    let raw = source.load()?;
    let json = validated_json(raw)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn validated_json(raw: RawConfig) -> Result<Value> {
    if raw.deployer.is_none() && raw.installer.is_none() {
        return Err(ValidationError::MissingSection("deployer").into());
    }

    let mut out = Map::new();
    let mut errors = Vec::new();

    if raw.deployer.is_some() {
        match validate_deployer(raw.deployer, &BlockDevices) {
            Ok(spec) => {
                out.insert("deployer".into(), serde_json::to_value(&spec)?);
            }
            Err(e) => errors.push(e),
        }
    }
    if raw.installer.is_some() {
        match validate_installer(raw.installer, &BlockDevices) {
            Ok(spec) => {
                out.insert("installer".into(), serde_json::to_value(&spec)?);
            }
            Err(e) => errors.push(e),
        }
    }

    match ValidationError::collect(errors) {
        Some(err) => Err(err.into()),
        None => Ok(Value::Object(out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{RawDeployer, RawInstaller};

    #[test]
    fn no_sections_is_a_validation_error() {
        let err = validated_json(RawConfig::default()).unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }

    #[test]
    fn credential_is_redacted_in_output() {
        // /dev/null opens like any device node.
        let raw = RawConfig {
            deployer: Some(RawDeployer {
                hostname: Some("arch1".into()),
                drive_name: Some("/dev/null".into()),
                boot_partition: Some("/dev/null1".into()),
                os_partition: Some("/dev/null2".into()),
                packages: None,
            }),
            installer: Some(RawInstaller {
                hostname: Some("arch1".into()),
                username: Some("alice".into()),
                password: Some("hunter2".into()),
                drive_name: Some("/dev/null".into()),
                boot_partition: Some("/dev/null".into()),
                ..RawInstaller::default()
            }),
        };

        let json = validated_json(raw).unwrap();
        assert_eq!(json["deployer"]["packages"][0], "base");
        assert_eq!(json["installer"]["credential"], "<plaintext credential>");
        assert_eq!(json["installer"]["timezone"], "America/New_York");
        assert!(!json.to_string().contains("hunter2"));
    }
}
