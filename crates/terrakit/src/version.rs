//! Toolchain version query parsing.

use crate::error::{Error, Result};
use crate::types::VersionInfo;
use regex::Regex;
use std::sync::LazyLock;

/// Arguments of the version query.
pub const VERSION_ARGS: &[&str] = &["version", "-json"];

static TEXT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Terraform\s+v?(?P<version>\S+)(?:\s+on\s+(?P<platform>\S+))?")
        .unwrap_or_else(|e| panic!("invalid version regex: {e}"))
});

/// Parse the output of `terraform version -json`.
///
/// Binaries predating `-json` print `Terraform v0.12.0\non linux_amd64`;
/// that form is accepted too.
pub fn parse_version(stdout: &str) -> Result<VersionInfo> {
    match serde_json::from_str::<VersionInfo>(stdout) {
        Ok(mut info) => {
            info.version = strip_v(&info.version).to_string();
            Ok(info)
        }
        Err(source) => parse_text(stdout).ok_or_else(|| Error::MalformedResult {
            command: VERSION_ARGS.join(" "),
            source,
        }),
    }
}

fn parse_text(stdout: &str) -> Option<VersionInfo> {
    let captures = TEXT_VERSION.captures(stdout)?;
    Some(VersionInfo {
        version: strip_v(&captures["version"]).to_string(),
        platform: captures
            .name("platform")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        provider_selections: Default::default(),
    })
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_version() {
        let info = parse_version(
            r#"{
  "terraform_version": "1.9.7",
  "platform": "darwin_arm64",
  "provider_selections": {
    "registry.terraform.io/massdriver-cloud/jq": "0.2.1"
  },
  "terraform_outdated": false
}"#,
        )
        .unwrap();
        assert_eq!(info.version, "1.9.7");
        assert_eq!(info.platform, "darwin_arm64");
        assert_eq!(info.platform.split('_').count(), 2);
        assert_eq!(
            info.provider_selections["registry.terraform.io/massdriver-cloud/jq"],
            "0.2.1"
        );
    }

    #[test]
    fn test_parse_text_version() {
        let info = parse_version("Terraform v0.12.31\non linux_amd64").unwrap();
        assert_eq!(info.version, "0.12.31");
        assert_eq!(info.platform, "linux_amd64");
        assert!(info.provider_selections.is_empty());
    }

    #[test]
    fn test_parse_text_version_with_providers() {
        let text = "Terraform v1.5.7\non linux_amd64\n+ provider registry.terraform.io/hashicorp/local v2.5.2";
        let info = parse_version(text).unwrap();
        assert_eq!(info.version, "1.5.7");
        assert_eq!(info.platform, "linux_amd64");
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_version("command not found").unwrap_err();
        assert!(matches!(err, Error::MalformedResult { .. }));
    }
}
