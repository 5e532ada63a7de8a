//! Variable and environment precedence.
//!
//! Layers, lowest to highest (later wins on key collision):
//!
//! 1. Ambient keys the session opted into with `inherit_environment`
//! 2. [`AUTOMATION_DEFAULTS`]
//! 3. The session baseline
//! 4. `TF_VAR_*` keys of the calling process environment
//! 5. Per-call overrides
//!
//! Merging is key-wise replace. Composite values are never merged
//! recursively, and an empty layer changes nothing. All maps are
//! `BTreeMap`s so the result never depends on insertion order.

use crate::types::{Environment, Variables};

/// Prefix terraform uses for input variables passed through the environment.
pub const VAR_PREFIX: &str = "TF_VAR_";

/// Keeps terraform from prompting and from emitting ANSI color codes.
pub const AUTOMATION_DEFAULTS: &[(&str, &str)] = &[
    ("TF_IN_AUTOMATION", "1"),
    ("TF_INPUT", "0"),
    ("NO_COLOR", "1"),
    ("TF_CLI_ARGS", "-no-color"),
    ("TF_CLI_ARGS_init", "-input=false -no-color"),
    ("TF_CLI_ARGS_validate", "-no-color"),
    ("TF_CLI_ARGS_plan", "-input=false -no-color"),
    ("TF_CLI_ARGS_apply", "-input=false -no-color -auto-approve"),
    ("TF_CLI_ARGS_destroy", "-input=false -no-color -auto-approve"),
];

/// Snapshot of the calling process environment.
///
/// Passed into the merge explicitly so merging stays a pure function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientEnv {
    vars: Environment,
}

impl AmbientEnv {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up one variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Variables carrying the input-variable prefix.
    pub fn prefixed(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter().filter(|(k, _)| k.starts_with(VAR_PREFIX))
    }
}

/// Strip every leading [`VAR_PREFIX`].
fn strip_prefix(key: &str) -> &str {
    let mut bare = key;
    while let Some(rest) = bare.strip_prefix(VAR_PREFIX) {
        bare = rest;
    }
    bare
}

/// terraform's own environment variables, matched exactly.
pub const CONTROL_KEYS: &[&str] = &[
    "TF_LOG",
    "TF_CLI_ARGS",
    "TF_CLI_CONFIG_FILE",
    "TF_IN_AUTOMATION",
    "TF_INPUT",
    "TF_DATA_DIR",
    "TF_WORKSPACE",
    "TF_PLUGIN_CACHE_DIR",
    "TF_PLUGIN_CACHE_MAY_BREAK_DEPENDENCY_LOCK_FILE",
    "TF_REGISTRY_DISCOVERY_RETRY",
    "TF_REGISTRY_CLIENT_TIMEOUT",
    "TF_STATE_PERSIST_INTERVAL",
    "TF_IGNORE",
    "TF_APPEND_USER_AGENT",
];

/// Families of terraform environment variables (`TF_LOG_PATH`, `TF_CLI_ARGS_plan`, ...).
pub const CONTROL_PREFIXES: &[&str] = &["TF_LOG_", "TF_CLI_ARGS_", "TF_TOKEN_"];

/// Whether `key` names one of terraform's own environment variables.
pub fn is_control_key(key: &str) -> bool {
    CONTROL_KEYS.contains(&key) || CONTROL_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Normalize an environment key.
///
/// terraform's own control variables ([`is_control_key`]) are returned
/// unchanged. Every other key is an input-variable name and comes back
/// prefixed exactly once, so `TF_region` becomes `TF_VAR_TF_region`.
pub fn normalize_env_key(key: &str) -> String {
    if is_control_key(key) {
        key.to_string()
    } else {
        format!("{VAR_PREFIX}{}", strip_prefix(key))
    }
}

/// Normalize a variables-file key to the bare variable name.
pub fn normalize_file_key(key: &str) -> String {
    strip_prefix(key).to_string()
}

fn overlay(target: &mut Environment, layer: Option<&Environment>) {
    for (key, value) in layer.into_iter().flatten() {
        target.insert(normalize_env_key(key), value.clone());
    }
}

/// Compute the complete child environment.
///
/// `inherit` names ambient variables copied verbatim below the automation
/// defaults. Beyond those, only `TF_VAR_*` ambient keys reach the child.
pub fn merge_environment(
    baseline: Option<&Environment>,
    ambient: &AmbientEnv,
    inherit: &[String],
    call: Option<&Environment>,
) -> Environment {
    let mut merged = Environment::new();

    for key in inherit {
        if let Some(value) = ambient.get(key) {
            merged.insert(key.clone(), value.to_string());
        }
    }

    for (key, value) in AUTOMATION_DEFAULTS {
        merged.insert((*key).to_string(), (*value).to_string());
    }

    overlay(&mut merged, baseline);

    for (key, value) in ambient.prefixed() {
        merged.insert(normalize_env_key(key), value.clone());
    }

    overlay(&mut merged, call);
    merged
}

/// Compute the input variables written to the autoloaded variables file.
pub fn merge_input_variables(baseline: Option<&Variables>, call: Option<&Variables>) -> Variables {
    let mut merged = Variables::new();
    for layer in [baseline, call] {
        for (key, value) in layer.into_iter().flatten() {
            merged.insert(normalize_file_key(key), value.clone());
        }
    }
    merged
}
