// src/system/executor.rs

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Exit code recorded when the program could not be found, as POSIX shells do.
pub const EXIT_CODE_NOT_FOUND: i32 = 127;

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' did not finish within {} seconds and was killed.", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
    #[error("Could not open redirection target '{path}': {source}")]
    Redirect {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What to run, where, and where its output goes.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub command_line: String,
    pub cwd: PathBuf,
    /// Redirects stdout to this file instead of capturing it.
    pub stdout_to: Option<PathBuf>,
    /// Redirects stderr to this file instead of capturing it.
    pub stderr_to: Option<PathBuf>,
    pub timeout: Duration,
}

/// Result of a finished process. Streams redirected to files are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command to completion, capturing whichever streams are not redirected.
///
/// The call blocks until the child exits or `timeout` elapses; on timeout the child
/// is killed and [`ExecutionError::TimedOut`] is returned. A program that does not
/// exist is not an error: it is reported as exit code 127 with the spawn error on
/// stderr, the way a shell would.
pub fn execute_with_capture(request: &ExecRequest) -> Result<ExecOutcome, ExecutionError> {
    let command_line = request.command_line.trim();
    if command_line.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }

    let parts = shlex::split(command_line)
        .ok_or_else(|| ExecutionError::CommandParse(command_line.to_string()))?;
    let (program, args) = parts.split_first().ok_or(ExecutionError::EmptyCommand)?;
    let clean_cwd = dunce::simplified(&request.cwd);

    // Fallback logic for Windows built-in commands like `echo`.
    // We try to spawn directly first. If it fails with `NotFound`, we try with `cmd /C`.
    let spawned = match build_command(program, args, clean_cwd, request)?.spawn() {
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            let cmd_args = ["/C".to_string(), command_line.to_string()];
            build_command("cmd", &cmd_args, clean_cwd, request)?.spawn()
        }
        other => other,
    };

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("Program '{}' not found.", program);
            return Ok(ExecOutcome {
                exit_code: EXIT_CODE_NOT_FOUND,
                stdout: request.stdout_to.is_none().then(String::new),
                stderr: request.stderr_to.is_none().then(|| {
                    format!("Cannot run program '{}': {}", program, e)
                }),
            });
        }
        Err(e) => return Err(ExecutionError::CommandFailed(command_line.to_string(), e)),
    };

    // Drain the pipes on helper threads so a chatty child never blocks on a full pipe.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = wait_with_deadline(&mut child, command_line, request.timeout)?;

    Ok(ExecOutcome {
        exit_code: status.code().unwrap_or(-1),
        stdout: stdout_reader.map(join_reader),
        stderr: stderr_reader.map(join_reader),
    })
}

fn build_command(
    program: &str,
    args: &[String],
    cwd: &Path,
    request: &ExecRequest,
) -> Result<StdCommand, ExecutionError> {
    let mut command = StdCommand::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(output_target(request.stdout_to.as_deref())?)
        .stderr(output_target(request.stderr_to.as_deref())?);
    Ok(command)
}

fn output_target(redirect: Option<&Path>) -> Result<Stdio, ExecutionError> {
    match redirect {
        None => Ok(Stdio::piped()),
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ExecutionError::Redirect {
                    path: path.display().to_string(),
                    source: e,
                })?;
            }
            let file = File::create(path).map_err(|e| ExecutionError::Redirect {
                path: path.display().to_string(),
                source: e,
            })?;
            Ok(Stdio::from(file))
        }
    }
}

/// Polls the child until it exits, killing it once the deadline has passed.
/// A timeout too large to represent as an instant means no deadline.
fn wait_with_deadline(
    child: &mut Child,
    command_line: &str,
    timeout: Duration,
) -> Result<ExitStatus, ExecutionError> {
    let deadline = Instant::now().checked_add(timeout);
    if deadline.is_none() {
        log::debug!("Timeout of {}s is unbounded, waiting without deadline.", timeout.as_secs());
    }
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    log::debug!(
                        "Timeout reached, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::TimedOut {
                        command: command_line.to_string(),
                        timeout,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed(command_line.to_string(), e));
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buffer) {
            log::warn!("Failed to read child output: {}", e);
        }
        buffer
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(command_line: &str, cwd: &Path) -> ExecRequest {
        ExecRequest {
            command_line: command_line.to_string(),
            cwd: cwd.to_path_buf(),
            stdout_to: None,
            stderr_to: None,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_captures_stdout_and_exit_code() {
        let dir = tempdir().unwrap();
        let outcome = execute_with_capture(&request("echo 123", dir.path())).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout.as_deref().map(str::trim_end), Some("123"));
        assert_eq!(outcome.stderr.as_deref(), Some(""));
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let dir = tempdir().unwrap();
        let outcome =
            execute_with_capture(&request("sh -c 'echo oops >&2; exit 3'", dir.path())).unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr.as_deref().map(str::trim_end), Some("oops"));
        assert!(!outcome.success());
    }

    #[test]
    fn test_missing_program_reports_127() {
        let dir = tempdir().unwrap();
        let outcome =
            execute_with_capture(&request("definitely-not-a-real-binary-xyz", dir.path())).unwrap();
        assert_eq!(outcome.exit_code, EXIT_CODE_NOT_FOUND);
        assert!(!outcome.stderr.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_redirected_stdout_goes_to_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out").join("version.txt");
        let mut req = request("echo redirected", dir.path());
        req.stdout_to = Some(target.clone());

        let outcome = execute_with_capture(&req).unwrap();

        assert!(outcome.stdout.is_none());
        assert_eq!(std::fs::read_to_string(target).unwrap().trim_end(), "redirected");
    }

    #[test]
    fn test_timeout_kills_the_child() {
        let dir = tempdir().unwrap();
        let mut req = request("sleep 5", dir.path());
        req.timeout = Duration::from_millis(200);

        let started = Instant::now();
        let err = execute_with_capture(&req).unwrap_err();

        assert!(matches!(err, ExecutionError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_unrepresentable_timeout_waits_without_deadline() {
        let dir = tempdir().unwrap();
        let mut req = request("echo done", dir.path());
        req.timeout = Duration::from_secs(u64::MAX);

        let outcome = execute_with_capture(&req).unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.as_deref().map(str::trim_end), Some("done"));
    }

    #[test]
    fn test_unbalanced_quotes_fail_to_parse() {
        let dir = tempdir().unwrap();
        let err = execute_with_capture(&request("echo 'open", dir.path())).unwrap_err();
        assert!(matches!(err, ExecutionError::CommandParse(_)));
    }
}
