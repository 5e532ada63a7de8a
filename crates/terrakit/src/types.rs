//! Core types for terraform invocations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Input variables keyed by name, with arbitrary JSON values.
pub type Variables = BTreeMap<String, serde_json::Value>;

/// Environment variables for a child process.
pub type Environment = BTreeMap<String, String>;

/// Baseline configuration bound to one workspace session.
///
/// Immutable once the session is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Path to the terraform executable
    pub executable: PathBuf,
    /// Directory holding the configuration, the variables file and the plan artifact
    pub working_directory: PathBuf,
    /// Exact version the binary must report, if any
    pub required_version: Option<String>,
    /// Input variables written to the autoloaded variables file on every call
    pub variables: Variables,
    /// Environment applied to every call (input variables are prefixed)
    pub environment: Environment,
    /// Ambient variables copied verbatim into the child (e.g. `PATH`)
    pub inherit_environment: Vec<String>,
}

impl WorkspaceConfig {
    /// Create a config with empty baselines.
    pub fn new(executable: impl Into<PathBuf>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_directory: working_directory.into(),
            required_version: None,
            variables: Variables::new(),
            environment: Environment::new(),
            inherit_environment: Vec::new(),
        }
    }
}

/// Per-call overrides. Dropped after the call; nothing persists in the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Input variables overriding the baseline for this call only
    pub variables: Variables,
    /// Environment overriding the baseline for this call only
    pub environment: Environment,
}

impl CallOptions {
    /// Create empty call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input variable override.
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Add an environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Whether no override is set.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.environment.is_empty()
    }
}

/// One request to run a terraform subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Subcommand, possibly multi-word (e.g. `"providers schema"`)
    pub subcommand: String,
    /// Flags and positional arguments following the subcommand
    pub args: Vec<String>,
    /// Payload written to the child's stdin before it is closed
    pub stdin: String,
    /// Exit code treated as success
    pub expected_exit_code: i32,
    /// Return the raw result whatever the exit code
    pub ignore_exit_code: bool,
    /// Per-call overrides
    pub call: CallOptions,
}

impl InvocationRequest {
    /// Create a request for a subcommand with default expectations.
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            subcommand: subcommand.into(),
            args: Vec::new(),
            stdin: String::new(),
            expected_exit_code: 0,
            ignore_exit_code: false,
            call: CallOptions::default(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the stdin payload.
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = payload.into();
        self
    }

    /// Set the expected exit code.
    pub fn expect_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    /// Accept any exit code.
    pub fn ignore_exit_code(mut self) -> Self {
        self.ignore_exit_code = true;
        self
    }

    /// Set per-call overrides.
    pub fn with_call(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }

    /// The argument vector passed to the executable.
    pub fn argv(&self) -> Vec<String> {
        self.subcommand
            .split_whitespace()
            .map(str::to_string)
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// The command line without the executable, for messages.
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}

/// Raw result of one child process run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Standard output, right-trimmed
    pub stdout: String,
    /// Standard error, right-trimmed
    pub stderr: String,
    /// Exit code (`-1` when the child was killed by a signal)
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Create a result.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Split into `(stdout, stderr, exit_code)`.
    pub fn into_parts(self) -> (String, String, i32) {
        (self.stdout, self.stderr, self.exit_code)
    }
}

/// Toolchain identity, resolved once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version without the leading `v` (e.g. `1.9.7`)
    #[serde(rename = "terraform_version")]
    pub version: String,
    /// Platform string (e.g. `linux_amd64`)
    #[serde(default)]
    pub platform: String,
    /// Provider source address to selected version
    #[serde(default)]
    pub provider_selections: BTreeMap<String, String>,
}

/// A fully resolved child process run, handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Executable to spawn
    pub executable: PathBuf,
    /// Arguments, subcommand first
    pub args: Vec<String>,
    /// Working directory of the child
    pub working_directory: PathBuf,
    /// Payload for stdin
    pub stdin: String,
    /// Complete environment; replaces the ambient one
    pub environment: Environment,
    /// Input variables for the autoloaded variables file
    pub variables: Variables,
}

impl Invocation {
    /// The subcommand (first argument), if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// The command line without the executable, for messages.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_argv_splits_multiword_subcommand() {
        let request = InvocationRequest::new("providers schema").arg("-json");
        assert_eq!(request.argv(), vec!["providers", "schema", "-json"]);
        assert_eq!(request.command_line(), "providers schema -json");
    }

    #[test]
    fn test_request_defaults() {
        let request = InvocationRequest::new("plan");
        assert_eq!(request.expected_exit_code, 0);
        assert!(!request.ignore_exit_code);
        assert!(request.stdin.is_empty());
        assert!(request.call.is_empty());
    }

    #[test]
    fn test_call_options_builder() {
        let call = CallOptions::new()
            .variable("baz", json!([1, 2]))
            .env("foo", "env_bar");
        assert_eq!(call.variables["baz"], json!([1, 2]));
        assert_eq!(call.environment["foo"], "env_bar");
        assert!(!call.is_empty());
    }

    #[test]
    fn test_version_info_from_terraform_json() {
        let info: VersionInfo = serde_json::from_value(json!({
            "terraform_version": "1.9.7",
            "platform": "linux_amd64",
            "provider_selections": {"registry.terraform.io/hashicorp/local": "2.5.2"},
            "terraform_outdated": true
        }))
        .unwrap();
        assert_eq!(info.version, "1.9.7");
        assert_eq!(info.platform, "linux_amd64");
        assert_eq!(info.provider_selections.len(), 1);
    }
}
