//! Backend abstraction for running terraform.
//!
//! The [`Backend`] trait is the process-execution seam of a
//! [`Workspace`](crate::Workspace): the session resolves everything
//! (arguments, environment, variables) and the backend runs it once.
//!
//! # Testing
//!
//! Use [`MockBackend`] to exercise sessions without a terraform binary:
//!
//! ```
//! use terrakit::backend::{Backend, MockBackend};
//! use terrakit::{ExecutionResult, Invocation};
//!
//! let mock = MockBackend::new();
//! mock.respond("output", ExecutionResult::new(r#"{"foo":{"value":"bar"}}"#, "", 0));
//!
//! let invocation = Invocation {
//!     executable: "terraform".into(),
//!     args: vec!["output".into(), "-json".into()],
//!     working_directory: std::env::temp_dir(),
//!     stdin: String::new(),
//!     environment: Default::default(),
//!     variables: Default::default(),
//! };
//! let result = mock.execute(&invocation).unwrap();
//! assert!(result.stdout.contains("bar"));
//! assert_eq!(mock.invocations().len(), 1);
//! ```

pub mod process;

use crate::error::Result;
use crate::types::{ExecutionResult, Invocation};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Name of the autoloaded variables file written into the workspace.
pub const VARIABLES_FILE: &str = "terrapin.auto.tfvars.json";

/// Runs one fully resolved invocation.
pub trait Backend: Send + Sync {
    /// Execute the invocation and block until the child exits.
    ///
    /// Implementations return the raw result whatever the exit code;
    /// classification happens in the caller.
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult>;
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, VecDeque<ExecutionResult>>,
    invocations: Vec<Invocation>,
    create_plan_files: bool,
}

/// In-memory backend for tests.
///
/// Responses are registered per command prefix (`"apply"`,
/// `"state pull"`); the longest matching prefix wins. A queue with more
/// than one entry is consumed in order, the last entry sticks. Commands
/// without a response succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new mock that creates plan files for `-out=` arguments.
    pub fn new() -> Self {
        let mock = Self::default();
        mock.lock().create_plan_files = true;
        mock
    }

    /// Create a mock that answers `version -json` with the given identity.
    pub fn with_version(version: &str, platform: &str) -> Self {
        let mock = Self::new();
        let body = serde_json::json!({
            "terraform_version": version,
            "platform": platform,
            "provider_selections": {},
            "terraform_outdated": false,
        });
        mock.respond("version", ExecutionResult::new(body.to_string(), "", 0));
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a response for commands starting with `prefix`.
    pub fn respond(&self, prefix: impl Into<String>, result: ExecutionResult) {
        self.lock()
            .responses
            .entry(prefix.into())
            .or_default()
            .push_back(result);
    }

    /// Toggle creation of plan files when `-out=<file>` is passed.
    pub fn set_create_plan_files(&self, enabled: bool) {
        self.lock().create_plan_files = enabled;
    }

    /// All invocations seen so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    /// Command lines of all invocations seen so far.
    pub fn commands(&self) -> Vec<String> {
        self.lock()
            .invocations
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Forget recorded invocations.
    pub fn clear(&self) {
        self.lock().invocations.clear();
    }
}

impl Backend for MockBackend {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let mut state = self.lock();
        state.invocations.push(invocation.clone());

        if state.create_plan_files {
            for arg in &invocation.args {
                if let Some(file) = arg.strip_prefix("-out=") {
                    std::fs::write(invocation.working_directory.join(file), b"mock plan")?;
                }
            }
        }

        let command = invocation.command_line();
        let key = state
            .responses
            .keys()
            .filter(|prefix| command.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .cloned();

        let result = match key.and_then(|k| state.responses.get_mut(&k)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => ExecutionResult::default(),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn invocation(dir: PathBuf, args: &[&str]) -> Invocation {
        Invocation {
            executable: PathBuf::from("terraform"),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_directory: dir,
            stdin: String::new(),
            environment: Default::default(),
            variables: Default::default(),
        }
    }

    #[test]
    fn test_mock_default_response() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        let result = mock
            .execute(&invocation(dir.path().to_path_buf(), &["init"]))
            .unwrap();
        assert_eq!(result, ExecutionResult::default());
        assert_eq!(mock.commands(), vec!["init"]);
    }

    #[test]
    fn test_mock_longest_prefix_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        mock.respond("state", ExecutionResult::new("list", "", 0));
        mock.respond("state pull", ExecutionResult::new("{}", "", 0));

        let pull = mock
            .execute(&invocation(dir.path().to_path_buf(), &["state", "pull"]))
            .unwrap();
        assert_eq!(pull.stdout, "{}");
        let list = mock
            .execute(&invocation(dir.path().to_path_buf(), &["state", "list"]))
            .unwrap();
        assert_eq!(list.stdout, "list");
    }

    #[test]
    fn test_mock_queue_then_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        mock.respond("apply", ExecutionResult::new("1 added", "", 0));
        mock.respond("apply", ExecutionResult::new("0 added", "", 0));

        let run = |m: &MockBackend| {
            m.execute(&invocation(dir.path().to_path_buf(), &["apply"]))
                .unwrap()
                .stdout
        };
        assert_eq!(run(&mock), "1 added");
        assert_eq!(run(&mock), "0 added");
        assert_eq!(run(&mock), "0 added");
    }

    #[test]
    fn test_mock_creates_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        mock.execute(&invocation(dir.path().to_path_buf(), &["plan", "-out=current.tfplan"]))
            .unwrap();
        assert!(dir.path().join("current.tfplan").exists());

        mock.set_create_plan_files(false);
        mock.execute(&invocation(dir.path().to_path_buf(), &["plan", "-out=other.tfplan"]))
            .unwrap();
        assert!(!dir.path().join("other.tfplan").exists());
    }
}
