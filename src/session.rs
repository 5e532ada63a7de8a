//! Build a terrakit workspace from settings and command-line flags.
//!
//! Settings become the session baseline. `--var`/`--env` flags become
//! call-level overrides for plan, apply and destroy. Commands without
//! call-level overrides get them folded into the baseline instead.

use anyhow::{Context, Result};
use std::path::PathBuf;
use terrakit::{CallOptions, Workspace, WorkspaceBuilder};

use crate::cli::GlobalArgs;
use crate::config::Settings;
use crate::paths;

pub struct Session {
    pub dir: PathBuf,
    pub settings: Settings,
    pub overrides: CallOptions,
}

impl Session {
    /// Resolve settings for the workspace named by the global flags
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let global_file = paths::global_config_file().ok();
        let settings = Settings::resolve(global_file.as_deref(), &global.dir)?;
        Ok(Self::from_parts(global, settings))
    }

    /// Apply command-line flags on top of resolved settings
    pub fn from_parts(global: &GlobalArgs, mut settings: Settings) -> Self {
        if let Some(path) = &global.terraform {
            settings.executable = Some(path.display().to_string());
        }
        if let Some(version) = &global.required_version {
            settings.required_version = Some(version.clone());
        }
        if let Some(check) = global.plan_check {
            settings.plan_check = Some(check.into());
        }

        let mut overrides = CallOptions::new();
        for (key, value) in &global.vars {
            overrides = overrides.variable(key.clone(), value.clone());
        }
        for (key, value) in &global.env {
            overrides = overrides.env(key.clone(), value.clone());
        }

        Self {
            dir: global.dir.clone(),
            settings,
            overrides,
        }
    }

    /// Builder carrying the settings baseline
    pub fn builder(&self) -> WorkspaceBuilder {
        let settings = &self.settings;
        let mut builder = Workspace::builder(&self.dir)
            .variables(settings.json_variables())
            .environment(settings.environment.clone())
            .inherit_environment(settings.inherit_environment.iter().cloned())
            .plan_check(settings.plan_check.unwrap_or_default().build());
        if let Some(path) = settings.executable_path() {
            builder = builder.executable(path);
        }
        if let Some(version) = &settings.required_version {
            builder = builder.required_version(version.clone());
        }
        builder
    }

    /// Builder with the flag overrides folded into the baseline
    pub fn builder_with_overrides(&self) -> WorkspaceBuilder {
        self.builder()
            .variables(self.overrides.variables.clone())
            .environment(self.overrides.environment.clone())
    }

    /// Open the workspace
    pub fn open(&self) -> Result<Workspace> {
        self.builder()
            .build()
            .with_context(|| format!("Could not open workspace {}", self.dir.display()))
    }

    /// Open the workspace with the flag overrides in the baseline
    pub fn open_with_overrides(&self) -> Result<Workspace> {
        self.builder_with_overrides()
            .build()
            .with_context(|| format!("Could not open workspace {}", self.dir.display()))
    }
}
