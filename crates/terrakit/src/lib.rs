//! # terrakit
//!
//! Pure Rust library for driving the terraform CLI.
//!
//! This crate provides functionality for:
//! - Resolving environment and input variables from layered sources
//! - Running terraform subcommands with a controlled environment and working directory
//! - Classifying exit codes and decoding JSON output into a path-addressable view
//! - Plan-then-apply with a cached plan artifact
//!
//! ## Example
//!
//! ```no_run
//! use terrakit::{CallOptions, Workspace};
//!
//! let workspace = Workspace::builder("/tmp/stack")
//!     .variable("region", "eu-west-1")
//!     .env("TF_LOG", "info")
//!     .build()
//!     .expect("terraform not available");
//!
//! println!("terraform {}", workspace.version().unwrap());
//!
//! // Plans on first use, then applies the plan artifact
//! let result = workspace
//!     .apply(&[], &CallOptions::new().variable("replicas", 3))
//!     .expect("apply failed");
//! println!("{}", result.stdout);
//!
//! let outputs = workspace.output().expect("no outputs");
//! println!("{:?}", outputs.get_str("endpoint¬value"));
//! ```
//!
//! ## Variable precedence
//!
//! Lowest to highest: opted-in ambient variables, automation defaults,
//! session baseline, `TF_VAR_*` from the calling process, per-call
//! overrides. See [`vars`].
//!
//! ## Concurrency
//!
//! Every operation blocks until the child exits. Sessions on different
//! directories are independent. Two sessions, or concurrent calls through
//! one session, on the same directory race on the variables file and the
//! plan artifact; callers must serialize them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod classify;
pub mod error;
pub mod layout;
pub mod plan;
pub mod types;
pub mod vars;
pub mod version;
pub mod view;

pub use backend::{Backend, MockBackend, VARIABLES_FILE};
pub use error::{Error, ErrorCategory, Result};
pub use plan::{
    ExistenceCheck, FingerprintCheck, NoCallback, PLAN_ARTIFACT, PlanCheck, PlanCheckKind,
    PlanState, Step, StepCallback,
};
pub use types::{
    CallOptions, Environment, ExecutionResult, Invocation, InvocationRequest, Variables,
    VersionInfo, WorkspaceConfig,
};
pub use vars::AmbientEnv;
pub use view::{JsonView, KEYPATH_SEPARATOR};

use backend::process::ProcessBackend;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Locate the terraform executable.
///
/// Looks in `PATH` first, then `~/.local/bin/terraform`.
pub fn find_terraform() -> Result<PathBuf> {
    if let Ok(path) = which::which("terraform") {
        return Ok(path);
    }
    if let Some(home) = dirs::home_dir() {
        let local = home.join(".local").join("bin").join("terraform");
        if local.is_file() {
            return Ok(local);
        }
    }
    Err(Error::ExecutableNotFound(
        "terraform is not in PATH or ~/.local/bin".to_string(),
    ))
}

/// Builder for a [`Workspace`].
pub struct WorkspaceBuilder {
    working_directory: PathBuf,
    executable: Option<PathBuf>,
    required_version: Option<String>,
    variables: Variables,
    environment: Environment,
    inherit_environment: Vec<String>,
    ambient: Option<AmbientEnv>,
    plan_check: Option<Box<dyn PlanCheck>>,
    backend: Option<Box<dyn Backend>>,
}

impl WorkspaceBuilder {
    fn new(working_directory: PathBuf) -> Self {
        Self {
            working_directory,
            executable: None,
            required_version: None,
            variables: Variables::new(),
            environment: Environment::new(),
            inherit_environment: Vec::new(),
            ambient: None,
            plan_check: None,
            backend: None,
        }
    }

    /// Start from an existing config.
    pub fn from_config(config: WorkspaceConfig) -> Self {
        Self {
            executable: Some(config.executable),
            required_version: config.required_version,
            variables: config.variables,
            environment: config.environment,
            inherit_environment: config.inherit_environment,
            ..Self::new(config.working_directory)
        }
    }

    /// Use this terraform executable instead of searching for one.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Require an exact version; checked in [`build`](Self::build).
    pub fn required_version(mut self, version: impl Into<String>) -> Self {
        self.required_version = Some(version.into());
        self
    }

    /// Add a baseline input variable.
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Add baseline input variables.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Add a baseline environment entry.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Add baseline environment entries.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment.extend(environment);
        self
    }

    /// Copy these ambient variables into the child verbatim.
    pub fn inherit_environment<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit_environment
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Use a fixed ambient snapshot instead of capturing one per call.
    pub fn ambient(mut self, ambient: AmbientEnv) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Decide planning state with this check (default: [`ExistenceCheck`]).
    pub fn plan_check(mut self, check: Box<dyn PlanCheck>) -> Self {
        self.plan_check = Some(check);
        self
    }

    /// Run invocations through this backend (default: child processes).
    pub fn backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the session, checking the required version if one is set.
    pub fn build(self) -> Result<Workspace> {
        if !self.working_directory.is_dir() {
            return Err(Error::WorkspaceNotFound(self.working_directory));
        }

        let executable = match (self.executable, &self.backend) {
            (Some(path), _) => path,
            (None, Some(_)) => PathBuf::from("terraform"),
            (None, None) => find_terraform()?,
        };

        let workspace = Workspace {
            config: WorkspaceConfig {
                executable,
                working_directory: self.working_directory,
                required_version: self.required_version,
                variables: self.variables,
                environment: self.environment,
                inherit_environment: self.inherit_environment,
            },
            backend: self
                .backend
                .unwrap_or_else(|| Box::new(ProcessBackend::new())),
            plan_check: self.plan_check.unwrap_or_else(|| Box::new(ExistenceCheck)),
            ambient: self.ambient,
            version: OnceLock::new(),
        };

        if let Some(required) = &workspace.config.required_version {
            let required = required.strip_prefix('v').unwrap_or(required);
            let found = &workspace.version_info()?.version;
            if found != required {
                return Err(Error::ToolchainMismatch {
                    required: required.to_string(),
                    found: found.clone(),
                });
            }
        }

        log::debug!(
            "workspace {} using {}",
            workspace.config.working_directory.display(),
            workspace.config.executable.display()
        );
        Ok(workspace)
    }
}

/// A session bound to one workspace directory and one baseline configuration.
///
/// Exposes one operation per terraform subcommand. Per-call overrides are
/// passed as [`CallOptions`] and never persist into later calls.
pub struct Workspace {
    config: WorkspaceConfig,
    backend: Box<dyn Backend>,
    plan_check: Box<dyn PlanCheck>,
    ambient: Option<AmbientEnv>,
    version: OnceLock<VersionInfo>,
}

impl Workspace {
    /// Start building a session for `working_directory`.
    pub fn builder(working_directory: impl Into<PathBuf>) -> WorkspaceBuilder {
        WorkspaceBuilder::new(working_directory.into())
    }

    /// Session with default settings.
    pub fn new(working_directory: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(working_directory).build()
    }

    /// The baseline configuration.
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// The workspace directory.
    pub fn working_directory(&self) -> &Path {
        &self.config.working_directory
    }

    /// The terraform executable.
    pub fn executable(&self) -> &Path {
        &self.config.executable
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Resolve a request into a complete invocation.
    pub fn resolve(&self, request: &InvocationRequest) -> Invocation {
        let captured;
        let ambient = match &self.ambient {
            Some(snapshot) => snapshot,
            None => {
                captured = AmbientEnv::capture();
                &captured
            }
        };

        Invocation {
            executable: self.config.executable.clone(),
            args: request.argv(),
            working_directory: self.config.working_directory.clone(),
            stdin: request.stdin.clone(),
            environment: vars::merge_environment(
                Some(&self.config.environment),
                ambient,
                &self.config.inherit_environment,
                Some(&request.call.environment),
            ),
            variables: vars::merge_input_variables(
                Some(&self.config.variables),
                Some(&request.call.variables),
            ),
        }
    }

    /// Run any request and classify its exit code.
    pub fn invoke(&self, request: InvocationRequest) -> Result<ExecutionResult> {
        let invocation = self.resolve(&request);
        let result = self.backend.execute(&invocation)?;
        classify::classify(
            result,
            &request.command_line(),
            request.expected_exit_code,
            request.ignore_exit_code,
            &self.config.working_directory,
        )
    }

    fn invoke_json(&self, request: InvocationRequest) -> Result<JsonView> {
        let command = request.command_line();
        let result = self.invoke(request)?;
        classify::parse_json(&result, &command)
    }

    fn simple(&self, subcommand: &str, args: &[&str]) -> Result<ExecutionResult> {
        self.invoke(InvocationRequest::new(subcommand).args(args.iter().copied()))
    }

    fn with_call(
        &self,
        subcommand: &str,
        args: &[&str],
        call: &CallOptions,
    ) -> Result<ExecutionResult> {
        self.invoke(
            InvocationRequest::new(subcommand)
                .args(args.iter().copied())
                .with_call(call.clone()),
        )
    }

    // =========================================================================
    // Toolchain
    // =========================================================================

    /// Toolchain identity, queried once and cached for the session's lifetime.
    pub fn version_info(&self) -> Result<&VersionInfo> {
        if let Some(info) = self.version.get() {
            return Ok(info);
        }
        let result = self.invoke(InvocationRequest::new(version::VERSION_ARGS.join(" ")))?;
        let info = version::parse_version(&result.stdout)?;
        log::debug!("terraform version {} on {}", info.version, info.platform);
        Ok(self.version.get_or_init(|| info))
    }

    /// Version string without the leading `v`.
    pub fn version(&self) -> Result<&str> {
        Ok(&self.version_info()?.version)
    }

    /// Platform string, e.g. `linux_amd64`.
    pub fn platform(&self) -> Result<&str> {
        Ok(&self.version_info()?.platform)
    }

    /// Provider source address to selected version.
    pub fn provider_selections(&self) -> Result<&BTreeMap<String, String>> {
        Ok(&self.version_info()?.provider_selections)
    }

    // =========================================================================
    // Subcommands
    // =========================================================================

    /// `terraform init`.
    pub fn init(&self, args: &[&str]) -> Result<ExecutionResult> {
        self.simple("init", args)
    }

    /// `terraform validate`. The exit code is not checked.
    pub fn validate(&self, args: &[&str]) -> Result<ExecutionResult> {
        self.invoke(
            InvocationRequest::new("validate")
                .args(args.iter().copied())
                .ignore_exit_code(),
        )
    }

    /// `terraform validate -json`, decoded (`valid`, `error_count`, `diagnostics`).
    pub fn validate_json(&self) -> Result<JsonView> {
        self.validate_json_with(&[])
    }

    /// `terraform validate -json` with extra arguments, decoded.
    pub fn validate_json_with(&self, args: &[&str]) -> Result<JsonView> {
        self.invoke_json(
            InvocationRequest::new("validate")
                .arg("-json")
                .args(args.iter().copied())
                .ignore_exit_code(),
        )
    }

    /// `terraform plan` with the given arguments. Writes no artifact by itself.
    pub fn plan(&self, args: &[&str], call: &CallOptions) -> Result<ExecutionResult> {
        self.with_call("plan", args, call)
    }

    /// `terraform plan -out=<artifact>`, leaving the workspace planned.
    pub fn save_plan(&self, args: &[&str], call: &CallOptions) -> Result<ExecutionResult> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let request = plan::plan_request(&args, call);
        let fingerprint = self.fingerprint(&request);
        let result = self.invoke(request)?;
        self.plan_check
            .record(&self.config.working_directory, &fingerprint)?;
        Ok(result)
    }

    /// Apply, planning first when the workspace has no plan.
    pub fn apply(&self, args: &[&str], call: &CallOptions) -> Result<ExecutionResult> {
        self.apply_with_callback(args, call, &NoCallback)
    }

    /// [`apply`](Self::apply) reporting each step to `callback`.
    pub fn apply_with_callback(
        &self,
        args: &[&str],
        call: &CallOptions,
        callback: &dyn StepCallback,
    ) -> Result<ExecutionResult> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let fingerprint = self.fingerprint(&plan::apply_request(&args, call));
        let state = self
            .plan_check
            .state(&self.config.working_directory, &fingerprint);
        log::debug!("plan state ({}): {}", self.plan_check.name(), state);

        plan::orchestrate_apply(
            state,
            &args,
            call,
            callback,
            || {
                self.plan_check
                    .record(&self.config.working_directory, &fingerprint)
            },
            |request| self.invoke(request),
        )
    }

    /// `terraform destroy`.
    pub fn destroy(&self, args: &[&str], call: &CallOptions) -> Result<ExecutionResult> {
        self.with_call("destroy", args, call)
    }

    /// `terraform output -json`, decoded.
    pub fn output(&self) -> Result<JsonView> {
        self.output_with(&[])
    }

    /// `terraform output` with explicit arguments (default `-json`), decoded.
    pub fn output_with(&self, args: &[&str]) -> Result<JsonView> {
        let args = if args.is_empty() { &["-json"][..] } else { args };
        self.invoke_json(InvocationRequest::new("output").args(args.iter().copied()))
    }

    /// `terraform state <args>`, raw.
    pub fn state(&self, args: &[&str]) -> Result<ExecutionResult> {
        self.simple("state", args)
    }

    /// `terraform state pull`, decoded.
    pub fn state_pull(&self) -> Result<JsonView> {
        self.invoke_json(InvocationRequest::new("state pull"))
    }

    /// Alias of [`state_pull`](Self::state_pull).
    pub fn tfstate(&self) -> Result<JsonView> {
        self.state_pull()
    }

    /// The `resources` list of the current state (empty when absent).
    pub fn resources(&self) -> Result<JsonView> {
        Ok(self
            .state_pull()?
            .child("resources")
            .unwrap_or_else(|| JsonView::new(serde_json::Value::Array(Vec::new()))))
    }

    /// The `outputs` mapping of the current state (empty when absent).
    pub fn outputs(&self) -> Result<JsonView> {
        Ok(self
            .state_pull()?
            .child("outputs")
            .unwrap_or_else(|| JsonView::new(serde_json::json!({}))))
    }

    /// `terraform providers schema -json`, decoded.
    pub fn providers_schema(&self) -> Result<JsonView> {
        self.invoke_json(InvocationRequest::new("providers schema").arg("-json"))
    }

    /// `terraform modules -json`, decoded.
    pub fn modules(&self) -> Result<JsonView> {
        self.invoke_json(InvocationRequest::new("modules").arg("-json"))
    }

    /// `terraform fmt -recursive`.
    pub fn fmt(&self) -> Result<ExecutionResult> {
        self.simple("fmt", &["-recursive"])
    }

    /// Name of the selected terraform workspace.
    pub fn workspace_show(&self) -> Result<String> {
        Ok(self.simple("workspace show", &[])?.stdout.trim().to_string())
    }

    /// Write the default file layout into the workspace directory.
    pub fn make_layout(&self) -> Result<Vec<PathBuf>> {
        layout::make_layout(&self.config.working_directory)
    }

    // =========================================================================
    // Plan state
    // =========================================================================

    /// Path of the plan artifact.
    pub fn plan_artifact(&self) -> PathBuf {
        self.config.working_directory.join(PLAN_ARTIFACT)
    }

    /// Planning state an apply with `call` would see.
    pub fn plan_state(&self, call: &CallOptions) -> PlanState {
        let fingerprint = self.fingerprint(&plan::apply_request(&[], call));
        self.plan_check
            .state(&self.config.working_directory, &fingerprint)
    }

    /// Whether an apply without overrides would skip planning.
    pub fn has_plan(&self) -> bool {
        self.plan_state(&CallOptions::default()) == PlanState::Planned
    }

    fn fingerprint(&self, request: &InvocationRequest) -> String {
        let invocation = self.resolve(request);
        plan::fingerprint(&invocation.environment, &invocation.variables)
    }
}
