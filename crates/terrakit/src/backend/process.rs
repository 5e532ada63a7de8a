//! Real terraform backend using child processes.

use crate::backend::{Backend, VARIABLES_FILE};
use crate::error::{Error, Result};
use crate::types::{ExecutionResult, Invocation, Variables};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

/// Backend that spawns the terraform executable.
///
/// Each call writes the autoloaded variables file, spawns exactly one
/// child with the resolved environment replacing the ambient one, feeds
/// stdin, and blocks until the child exits. No timeout is enforced.
///
/// The child's working directory is set on the child only; the calling
/// process's current directory is never changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl ProcessBackend {
    /// Create a new ProcessBackend.
    pub fn new() -> Self {
        Self
    }
}

/// Write the variables file for one call, replacing any previous content.
pub fn write_variables_file(dir: &Path, variables: &Variables) -> Result<PathBuf> {
    let path = dir.join(VARIABLES_FILE);
    let content = serde_json::to_string_pretty(variables)?;
    std::fs::write(&path, content).map_err(|source| Error::VariablesFile {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn read_stream<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error only truncates what we report; the exit code still decides.
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

/// Write the payload and close the pipe.
///
/// A child exiting without reading its input is not an error.
fn feed_stdin<W: Write>(mut stdin: W, payload: &str) -> Option<std::io::Error> {
    if payload.is_empty() {
        return None;
    }
    stdin
        .write_all(payload.as_bytes())
        .err()
        .filter(|e| e.kind() != std::io::ErrorKind::BrokenPipe)
}

/// Kill and reap the child, then drain its readers.
fn abort(child: &mut Child, readers: [thread::JoinHandle<Vec<u8>>; 2]) {
    // kill fails only if the child already exited
    let _ = child.kill();
    let _ = child.wait();
    for reader in readers {
        let _ = reader.join();
    }
}

impl Backend for ProcessBackend {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        let dir = &invocation.working_directory;
        if !dir.is_dir() {
            return Err(Error::WorkspaceNotFound(dir.clone()));
        }

        let variables_path = write_variables_file(dir, &invocation.variables)?;
        log::debug!(
            "terraform.exec({}) with {} in {} (variables: {})",
            invocation.command_line(),
            invocation.executable.display(),
            dir.display(),
            variables_path.display()
        );

        let mut child = Command::new(&invocation.executable)
            .args(&invocation.args)
            .current_dir(dir)
            .env_clear()
            .envs(&invocation.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    Error::ExecutableNotFound(invocation.executable.display().to_string())
                } else {
                    Error::Spawn {
                        executable: invocation.executable.clone(),
                        source,
                    }
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Other("stdout was not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Other("stderr was not piped".to_string()))?;
        let stdout_handle = read_stream(stdout);
        let stderr_handle = read_stream(stderr);

        let stdin_error = child
            .stdin
            .take()
            .and_then(|stdin| feed_stdin(stdin, &invocation.stdin));
        if let Some(e) = stdin_error {
            log::debug!("terraform.exec: writing stdin failed ({e}); killing child");
            abort(&mut child, [stdout_handle, stderr_handle]);
            return Err(Error::Io(e));
        }

        let status = child.wait()?;
        let stdout = stdout_handle
            .join()
            .map_err(|_| Error::Other("stdout reader panicked".to_string()))?;
        let stderr = stderr_handle
            .join()
            .map_err(|_| Error::Other("stderr reader panicked".to_string()))?;

        let result = ExecutionResult {
            stdout: decode(&stdout),
            stderr: decode(&stderr),
            exit_code: status.code().unwrap_or(-1),
        };
        log::debug!(
            "terraform.exec: exit_code:[{}] stdout:[{} bytes] stderr:[{}] cwd:[{}]",
            result.exit_code,
            result.stdout.len(),
            result.stderr,
            dir.display()
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::Environment;
    use serde_json::json;

    /// Write a shell script standing in for terraform.
    ///
    /// The script is run through `/bin/sh` rather than exec'd directly so
    /// parallel tests never hit ETXTBSY on a freshly written file.
    fn fake_terraform(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-terraform");
        std::fs::write(&path, format!("{body}\n")).unwrap();
        path
    }

    fn invocation(script: PathBuf, dir: &Path, args: &[&str]) -> Invocation {
        let mut argv = vec![script.display().to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        let mut environment = Environment::new();
        environment.insert("PATH".into(), "/usr/bin:/bin".into());
        Invocation {
            executable: PathBuf::from("/bin/sh"),
            args: argv,
            working_directory: dir.to_path_buf(),
            stdin: String::new(),
            environment,
            variables: Variables::new(),
        }
    }

    #[test]
    fn test_captures_and_trims_output() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), r#"echo "out $1  "; echo "err" >&2; exit 3"#);

        let result = ProcessBackend::new()
            .execute(&invocation(exe, ws.path(), &["plan"]))
            .unwrap();
        assert_eq!(result.stdout, "out plan");
        assert_eq!(result.stderr, "err");
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn test_environment_replaces_ambient() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), r#"echo "foo=$TF_VAR_foo home=${HOME:-unset}""#);

        let mut inv = invocation(exe, ws.path(), &["apply"]);
        inv.environment.insert("TF_VAR_foo".into(), "env_bar".into());
        let result = ProcessBackend::new().execute(&inv).unwrap();
        assert_eq!(result.stdout, "foo=env_bar home=unset");
    }

    #[test]
    fn test_stdin_is_fed_and_closed() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), "cat");

        let mut inv = invocation(exe, ws.path(), &["console"]);
        inv.stdin = "var.foo\n".to_string();
        let result = ProcessBackend::new().execute(&inv).unwrap();
        assert_eq!(result.stdout, "var.foo");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_runs_in_workspace_directory() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), &format!("cat {VARIABLES_FILE}"));
        let before = std::env::current_dir().unwrap();

        let mut inv = invocation(exe, ws.path(), &["plan"]);
        inv.variables.insert("foo".into(), json!("bar"));
        let result = ProcessBackend::new().execute(&inv).unwrap();
        let seen: serde_json::Value = serde_json::from_str(&result.stdout).unwrap();
        assert_eq!(seen, json!({"foo": "bar"}));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_variables_file_is_overwritten() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), "true");
        let backend = ProcessBackend::new();

        let mut first = invocation(exe.clone(), ws.path(), &["apply"]);
        first.variables.insert("foo".into(), json!("once"));
        backend.execute(&first).unwrap();

        backend.execute(&invocation(exe, ws.path(), &["apply"])).unwrap();
        let content = std::fs::read_to_string(ws.path().join(VARIABLES_FILE)).unwrap();
        let seen: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(seen, json!({}));
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(
            bin.path(),
            "i=0; while [ $i -lt 20000 ]; do echo \"line $i\"; echo \"err $i\" >&2; i=$((i+1)); done",
        );
        let result = ProcessBackend::new()
            .execute(&invocation(exe, ws.path(), &["plan"]))
            .unwrap();
        assert!(result.stdout.ends_with("line 19999"));
        assert!(result.stderr.ends_with("err 19999"));
    }

    #[test]
    fn test_signal_exit_code() {
        let bin = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let exe = fake_terraform(bin.path(), "echo partial; kill -9 $$");

        let result = ProcessBackend::new()
            .execute(&invocation(exe, ws.path(), &["apply"]))
            .unwrap();
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.stdout, "partial");
    }

    struct FailingWriter(std::io::ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(self.0))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_feed_stdin_errors() {
        let broken = FailingWriter(std::io::ErrorKind::BrokenPipe);
        assert!(feed_stdin(broken, "yes\n").is_none());

        let denied = FailingWriter(std::io::ErrorKind::PermissionDenied);
        let err = feed_stdin(denied, "yes\n").unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);

        // nothing to write, nothing to fail
        let idle = FailingWriter(std::io::ErrorKind::PermissionDenied);
        assert!(feed_stdin(idle, "").is_none());
    }

    #[test]
    fn test_abort_reaps_child_and_readers() {
        let mut child = Command::new("/bin/sh")
            .args(["-c", "exec sleep 30"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let readers = [
            read_stream(child.stdout.take().unwrap()),
            read_stream(child.stderr.take().unwrap()),
        ];

        let started = std::time::Instant::now();
        abort(&mut child, readers);
        assert!(started.elapsed() < std::time::Duration::from_secs(20));
        let status = child.try_wait().unwrap().expect("child reaped");
        assert_eq!(status.code(), None);
    }

    #[test]
    fn test_missing_executable() {
        let ws = tempfile::tempdir().unwrap();
        let mut inv = invocation(PathBuf::from("unused"), ws.path(), &["version"]);
        inv.executable = PathBuf::from("/nonexistent/terraform");
        let err = ProcessBackend::new().execute(&inv).unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
    }

    #[test]
    fn test_missing_workspace() {
        let err = ProcessBackend::new()
            .execute(&invocation(
                PathBuf::from("unused"),
                Path::new("/nonexistent/workspace"),
                &["version"],
            ))
            .unwrap_err();
        assert!(matches!(err, Error::WorkspaceNotFound(_)));
    }
}
