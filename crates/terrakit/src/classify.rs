//! Exit-code classification and JSON decoding of results.

use crate::error::{Error, Result};
use crate::types::ExecutionResult;
use crate::view::JsonView;
use std::path::Path;

/// Decide whether a raw result is a success.
///
/// Fails iff `ignore_exit_code` is false and the exit code differs from
/// `expected_exit_code`. Otherwise the raw result is returned untouched,
/// whatever its exit code.
pub fn classify(
    result: ExecutionResult,
    command: &str,
    expected_exit_code: i32,
    ignore_exit_code: bool,
    working_directory: &Path,
) -> Result<ExecutionResult> {
    if ignore_exit_code || result.exit_code == expected_exit_code {
        return Ok(result);
    }

    log::debug!(
        "terraform {command} exited with {} (expected {expected_exit_code})",
        result.exit_code
    );
    Err(Error::InvocationFailed {
        message: format!(
            "[Error]: exit_code {} running '{}': {}",
            result.exit_code, command, result.stderr
        ),
        command: command.to_string(),
        exit_code: result.exit_code,
        expected_exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
        working_directory: working_directory.to_path_buf(),
    })
}

/// Decode stdout of a JSON-emitting command.
pub fn parse_json(result: &ExecutionResult, command: &str) -> Result<JsonView> {
    JsonView::parse(&result.stdout).map_err(|source| Error::MalformedResult {
        command: command.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn dir() -> &'static Path {
        Path::new("/tmp/ws")
    }

    #[test]
    fn test_expected_code_passes() {
        let result = ExecutionResult::new("ok", "", 0);
        let classified = classify(result.clone(), "plan", 0, false, dir()).unwrap();
        assert_eq!(classified, result);
    }

    #[test]
    fn test_nonzero_fails_with_context() {
        let result = ExecutionResult::new("partial", "Error: boom", 1);
        let err = classify(result, "apply", 0, false, dir()).unwrap_err();
        match err {
            Error::InvocationFailed {
                exit_code,
                expected_exit_code,
                stdout,
                stderr,
                working_directory,
                command,
                message,
            } => {
                assert_eq!(exit_code, 1);
                assert_eq!(expected_exit_code, 0);
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "Error: boom");
                assert_eq!(working_directory, dir());
                assert_eq!(command, "apply");
                assert!(message.contains("Error: boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ignore_exit_code_returns_raw() {
        let result = ExecutionResult::new("", "invalid", 1);
        let classified = classify(result.clone(), "validate", 0, true, dir()).unwrap();
        assert_eq!(classified, result);
    }

    #[test]
    fn test_custom_expected_code() {
        // plan -detailed-exitcode reports 2 when changes are present
        let result = ExecutionResult::new("changes", "", 2);
        assert!(classify(result.clone(), "plan", 2, false, dir()).is_ok());
        let err = classify(ExecutionResult::new("", "", 0), "plan", 2, false, dir()).unwrap_err();
        assert_eq!(err.exit_code(), Some(0));
    }

    #[test]
    fn test_parse_json() {
        let result = ExecutionResult::new(r#"{"foo":{"value":"bar"}}"#, "", 0);
        let view = parse_json(&result, "output -json").unwrap();
        assert_eq!(view.get_str("foo¬value"), Some("bar"));
    }

    #[test]
    fn test_parse_json_malformed() {
        let result = ExecutionResult::new("Terraform v1.9.7", "", 0);
        let err = parse_json(&result, "output -json").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Malformed);
    }
}
