//! `terrapin.toml` and global `config.toml` settings.
//!
//! ```toml
//! executable = "~/.local/bin/terraform"
//! required_version = "1.9.7"
//! inherit_environment = ["PATH", "HOME"]
//! plan_check = "fingerprint"
//!
//! [variables]
//! region = "eu-west-1"
//! replicas = 3
//!
//! [environment]
//! TF_LOG = "warn"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use terrakit::{Environment, PlanCheckKind, Variables};

use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub executable: Option<String>,
    pub required_version: Option<String>,
    pub inherit_environment: Vec<String>,
    pub plan_check: Option<PlanCheckKind>,
    pub variables: BTreeMap<String, toml::Value>,
    pub environment: Environment,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid terrapin settings")
    }

    /// Load a settings file; a missing file yields `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings =
            Self::parse(&content).with_context(|| format!("Invalid {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(Some(settings))
    }

    /// Load the global defaults, then the project file on top
    pub fn resolve(global: Option<&Path>, workspace_dir: &Path) -> Result<Self> {
        let base = match global {
            Some(path) => Self::load(path)?.unwrap_or_default(),
            None => Self::default(),
        };
        let project = Self::load(&paths::project_file(workspace_dir))?.unwrap_or_default();
        Ok(base.merge(project))
    }

    /// Overlay `other` on `self`; set keys in `other` win
    pub fn merge(mut self, other: Self) -> Self {
        if other.executable.is_some() {
            self.executable = other.executable;
        }
        if other.required_version.is_some() {
            self.required_version = other.required_version;
        }
        if other.plan_check.is_some() {
            self.plan_check = other.plan_check;
        }
        for key in other.inherit_environment {
            if !self.inherit_environment.contains(&key) {
                self.inherit_environment.push(key);
            }
        }
        self.variables.extend(other.variables);
        self.environment.extend(other.environment);
        self
    }

    /// Executable path with `~` and variables expanded
    pub fn executable_path(&self) -> Option<PathBuf> {
        self.executable.as_deref().map(paths::expand)
    }

    /// Input variables as JSON values
    pub fn json_variables(&self) -> Variables {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), toml_to_json(v)))
            .collect()
    }
}

/// Convert a TOML value to the JSON value terraform receives.
///
/// Datetimes become strings; non-finite floats become `null`.
pub fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(dt) => Json::String(dt.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROJECT: &str = r#"
required_version = "1.9.7"
inherit_environment = ["PATH"]
plan_check = "fingerprint"

[variables]
foo = "tfvars_bar"
bar = true
baz = [1, 2]
ratio = 0.5
when = 2024-05-01T10:00:00Z

[variables.moo]
foo = "bar"
baz = "moo"

[environment]
TF_LOG = "warn"
foo = "nbar"
"#;

    #[test]
    fn test_parse_project_file() {
        let settings = Settings::parse(PROJECT).unwrap();
        assert_eq!(settings.required_version.as_deref(), Some("1.9.7"));
        assert_eq!(settings.plan_check, Some(PlanCheckKind::Fingerprint));
        assert_eq!(settings.inherit_environment, vec!["PATH"]);
        assert_eq!(settings.environment["foo"], "nbar");

        let vars = settings.json_variables();
        assert_eq!(vars["foo"], json!("tfvars_bar"));
        assert_eq!(vars["bar"], json!(true));
        assert_eq!(vars["baz"], json!([1, 2]));
        assert_eq!(vars["ratio"], json!(0.5));
        assert_eq!(vars["moo"], json!({"foo": "bar", "baz": "moo"}));
        assert!(vars["when"].as_str().unwrap().starts_with("2024-05-01"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Settings::parse("terraform_path = \"x\"").is_err());
    }

    #[test]
    fn test_merge_project_over_global() {
        let global = Settings::parse(
            r#"
executable = "/usr/local/bin/terraform"
inherit_environment = ["PATH", "HOME"]
[variables]
region = "us-east-1"
owner = "platform"
"#,
        )
        .unwrap();
        let project = Settings::parse(
            r#"
inherit_environment = ["PATH", "AWS_PROFILE"]
[variables]
region = "eu-west-1"
"#,
        )
        .unwrap();

        let merged = global.merge(project);
        assert_eq!(
            merged.executable_path(),
            Some(PathBuf::from("/usr/local/bin/terraform"))
        );
        assert_eq!(merged.inherit_environment, vec!["PATH", "HOME", "AWS_PROFILE"]);
        let vars = merged.json_variables();
        assert_eq!(vars["region"], json!("eu-west-1"));
        assert_eq!(vars["owner"], json!("platform"));
        assert_eq!(merged.plan_check, None);
    }

    #[test]
    fn test_resolve_from_files() {
        let config_dir = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let global = config_dir.path().join(paths::GLOBAL_CONFIG_FILE);
        fs::write(&global, "required_version = \"1.5.7\"\n").unwrap();
        fs::write(
            workspace.path().join(paths::PROJECT_FILE),
            "required_version = \"1.9.7\"\n[environment]\nTF_LOG = \"info\"\n",
        )
        .unwrap();

        let settings = Settings::resolve(Some(&global), workspace.path()).unwrap();
        assert_eq!(settings.required_version.as_deref(), Some("1.9.7"));
        assert_eq!(settings.environment["TF_LOG"], "info");
    }

    #[test]
    fn test_resolve_without_files() {
        let workspace = tempfile::tempdir().unwrap();
        let missing = workspace.path().join("nope.toml");
        let settings = Settings::resolve(Some(&missing), workspace.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_project_file_names_path() {
        let workspace = tempfile::tempdir().unwrap();
        fs::write(workspace.path().join(paths::PROJECT_FILE), "variables = 3").unwrap();
        let err = Settings::resolve(None, workspace.path()).unwrap_err();
        assert!(format!("{err:#}").contains("terrapin.toml"));
    }
}
