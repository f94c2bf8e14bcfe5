//! Executor - the boundary between tool code and the OS
//!
//! Runs a `Command` without a shell: argv[0] is spawned directly with the
//! remaining arguments. A non-zero exit is data, not an error. Only spawn
//! failures and timeouts surface as `ExecError`.
//!
//! Each step runs as the leader of its own process group. On timeout the
//! whole group gets SIGTERM, then SIGKILL after a short grace period, so
//! children of `sudo` or a package manager die with it.

use crate::command::Command;
use crate::errors::ExecError;
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Output cap per stream, large enough for package and log listings
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Time between SIGTERM and SIGKILL for a timed-out process group
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Captured outcome of a completed command (or chain)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit code of the last command that ran; -1 when killed by a signal
    pub exit_code: i32,
    pub duration_ms: u64,
    /// How many commands of the chain actually ran
    pub commands_run: usize,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `command` and its follow-ups, all under one deadline
    async fn execute(&self, command: &Command, timeout: Duration) -> Result<ExecResult, ExecError>;
}

/// Runs commands on this host via tokio::process
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }

    /// `current` holds the pid (= process group id) of the running step, 0 when idle
    async fn run_one(command: &Command, current: &AtomicU32) -> Result<(String, String, i32), ExecError> {
        let program = command.program().ok_or(ExecError::EmptyCommand)?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(command.args())
            .envs(&command.env)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecError::NotFound(program.to_string())
            } else {
                ExecError::Spawn {
                    program: program.to_string(),
                    source: e,
                }
            }
        })?;
        current.store(child.id().unwrap_or(0), Ordering::SeqCst);

        if let (Some(data), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            stdin.write_all(data.as_bytes()).await?;
            // Dropping stdin closes the pipe so the child sees EOF
        }

        let output = child.wait_with_output().await?;
        current.store(0, Ordering::SeqCst);
        Ok((
            truncate_output(&output.stdout),
            truncate_output(&output.stderr),
            output.status.code().unwrap_or(-1),
        ))
    }

    async fn run_chain(command: &Command, current: &AtomicU32) -> Result<ExecResult, ExecError> {
        let start = Instant::now();
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut commands_run = 0;

        for step in command.chain() {
            debug!("Executing: {}", step.render());
            let (out, err, code) = Self::run_one(step, current).await?;
            stdout.push_str(&out);
            stderr.push_str(&err);
            exit_code = code;
            commands_run += 1;
            if code != 0 {
                break;
            }
        }

        Ok(ExecResult {
            stdout,
            stderr,
            exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
            commands_run,
        })
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, command: &Command, timeout: Duration) -> Result<ExecResult, ExecError> {
        let current = AtomicU32::new(0);
        let chain = Self::run_chain(command, &current);
        tokio::pin!(chain);

        tokio::select! {
            result = &mut chain => result,
            _ = tokio::time::sleep(timeout) => {
                warn!("Command timed out after {:?}: {}", timeout, command.render());
                terminate_group(current.load(Ordering::SeqCst)).await;
                // Dropping the chain reaps the leader via kill_on_drop
                Err(ExecError::TimedOut(timeout))
            }
        }
    }
}

/// SIGTERM the process group led by `pgid`, then SIGKILL what is left
async fn terminate_group(pgid: u32) {
    if pgid == 0 {
        return;
    }
    let group = Pid::from_raw(pgid as i32);

    match killpg(group, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return,
        Err(e) => debug!("SIGTERM to process group {} failed: {}", pgid, e),
    }

    tokio::time::sleep(KILL_GRACE).await;

    match killpg(group, Signal::SIGKILL) {
        Ok(()) => debug!("Process group {} killed after grace period", pgid),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!("SIGKILL to process group {} failed: {}", pgid, e),
    }
}

fn truncate_output(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    if s.len() <= MAX_OUTPUT_BYTES {
        return s.into_owned();
    }
    let mut cut = MAX_OUTPUT_BYTES;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n[output truncated, {} bytes total]", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_output_short_is_unchanged() {
        assert_eq!(truncate_output(b"hello"), "hello");
    }

    #[test]
    fn test_truncate_output_long_is_marked() {
        let big = vec![b'a'; MAX_OUTPUT_BYTES + 10];
        let out = truncate_output(&big);
        assert!(out.ends_with(&format!("[output truncated, {} bytes total]", MAX_OUTPUT_BYTES + 10)));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let result = LocalExecutor
            .execute(&Command::new(Vec::<String>::new()), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(ExecError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_terminate_group_without_child_is_noop() {
        let start = Instant::now();
        terminate_group(0).await;
        assert!(start.elapsed() < KILL_GRACE);
    }
}
