//! Plan/apply orchestration over one workspace.
//!
//! A workspace is either [`PlanState::NoPlan`] or [`PlanState::Planned`].
//! `apply` on an unplanned workspace first runs `init -backend=false` and
//! `plan -out=<artifact>` with the same call-level overrides, then applies
//! the artifact. On a planned workspace it applies the artifact directly.
//! The artifact is never deleted here.
//!
//! Which state a workspace is in is decided by a [`PlanCheck`]. The
//! default [`ExistenceCheck`] looks only at whether the artifact exists,
//! so an apply with changed variables reuses the pinned plan.
//! [`FingerprintCheck`] additionally compares a hash of the resolved
//! inputs recorded at plan time and re-plans on mismatch.

use crate::error::Result;
use crate::types::{CallOptions, Environment, ExecutionResult, InvocationRequest, Variables};
use crate::vars::VAR_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fixed name of the plan artifact inside the workspace.
pub const PLAN_ARTIFACT: &str = "current.tfplan";

/// Sidecar holding the input fingerprint of the artifact.
pub const FINGERPRINT_FILE: &str = "current.tfplan.blake3";

/// Planning state of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    /// No usable plan artifact
    NoPlan,
    /// A plan artifact is ready to apply
    Planned,
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPlan => write!(f, "no plan"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

/// Reads (and records) the planning state of a workspace.
pub trait PlanCheck: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Current state for the given input fingerprint.
    fn state(&self, dir: &Path, fingerprint: &str) -> PlanState;

    /// Called after a plan artifact was written successfully.
    fn record(&self, _dir: &Path, _fingerprint: &str) -> Result<()> {
        Ok(())
    }
}

/// Planned iff the artifact file exists. Content and freshness are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistenceCheck;

impl PlanCheck for ExistenceCheck {
    fn name(&self) -> &'static str {
        "existence"
    }

    fn state(&self, dir: &Path, _fingerprint: &str) -> PlanState {
        if dir.join(PLAN_ARTIFACT).exists() {
            PlanState::Planned
        } else {
            PlanState::NoPlan
        }
    }
}

/// Planned iff the artifact exists and was produced from the same inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintCheck;

impl PlanCheck for FingerprintCheck {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn state(&self, dir: &Path, fingerprint: &str) -> PlanState {
        if ExistenceCheck.state(dir, fingerprint) == PlanState::NoPlan {
            return PlanState::NoPlan;
        }
        match std::fs::read_to_string(dir.join(FINGERPRINT_FILE)) {
            Ok(recorded) if recorded.trim() == fingerprint => PlanState::Planned,
            _ => PlanState::NoPlan,
        }
    }

    fn record(&self, dir: &Path, fingerprint: &str) -> Result<()> {
        std::fs::write(dir.join(FINGERPRINT_FILE), fingerprint)?;
        Ok(())
    }
}

/// Selectable plan checks, for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanCheckKind {
    /// [`ExistenceCheck`]
    #[default]
    Existence,
    /// [`FingerprintCheck`]
    Fingerprint,
}

impl PlanCheckKind {
    /// Build the check.
    pub fn build(self) -> Box<dyn PlanCheck> {
        match self {
            Self::Existence => Box::new(ExistenceCheck),
            Self::Fingerprint => Box::new(FingerprintCheck),
        }
    }
}

/// Hash of the inputs that shape a plan.
///
/// Covers input variables delivered through the environment and the
/// variables file. Both maps are ordered, so equal inputs hash equally.
pub fn fingerprint(environment: &Environment, variables: &Variables) -> String {
    let delivered: Environment = environment
        .iter()
        .filter(|(k, _)| k.starts_with(VAR_PREFIX))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let canonical = serde_json::json!({
        "environment": delivered,
        "variables": variables,
    });
    blake3::hash(canonical.to_string().as_bytes())
        .to_hex()
        .to_string()
}

/// A step of an orchestrated apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `init -backend=false`
    Init,
    /// `plan -out=<artifact>`
    Plan,
    /// `apply <artifact>`
    Apply,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Plan => write!(f, "plan"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// Receives orchestration progress.
pub trait StepCallback {
    /// Called before a step runs.
    fn on_step(&self, step: Step);
}

/// Callback that does nothing.
pub struct NoCallback;

impl StepCallback for NoCallback {
    fn on_step(&self, _step: Step) {}
}

/// Request for the throwaway init preceding an implicit plan.
pub fn init_request() -> InvocationRequest {
    InvocationRequest::new("init").arg("-backend=false")
}

/// Request writing the plan artifact.
pub fn plan_request(args: &[String], call: &CallOptions) -> InvocationRequest {
    InvocationRequest::new("plan")
        .arg(format!("-out={PLAN_ARTIFACT}"))
        .args(args.iter().cloned())
        .with_call(call.clone())
}

/// Request applying the plan artifact.
pub fn apply_request(args: &[String], call: &CallOptions) -> InvocationRequest {
    InvocationRequest::new("apply")
        .args(args.iter().cloned())
        .arg(PLAN_ARTIFACT)
        .with_call(call.clone())
}

/// Drive init → plan → apply for one call.
///
/// `state` is the already-read planning state and `run` executes and
/// classifies one request. `record` is invoked after the implicit plan
/// succeeds. Failures stop the sequence and leave earlier progress on disk.
pub fn orchestrate_apply<R, F>(
    state: PlanState,
    args: &[String],
    call: &CallOptions,
    callback: &dyn StepCallback,
    mut record: R,
    mut run: F,
) -> Result<ExecutionResult>
where
    R: FnMut() -> Result<()>,
    F: FnMut(InvocationRequest) -> Result<ExecutionResult>,
{
    if state == PlanState::NoPlan {
        log::info!("no plan artifact; running init and plan before apply");
        callback.on_step(Step::Init);
        run(init_request())?;
        callback.on_step(Step::Plan);
        run(plan_request(&[], call))?;
        record()?;
    } else {
        log::info!("applying existing plan artifact {PLAN_ARTIFACT}");
    }

    callback.on_step(Step::Apply);
    run(apply_request(args, call))
}
