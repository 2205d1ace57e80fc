//! Bounded process runner
//!
//! Spawns an [`Invocation`] directly (no shell), in the workspace root,
//! and waits at most `timeout`. On expiry the child is killed and reaped
//! before we return, so it is never left running behind the caller.

use crate::error::{GatewayError, Result};
use crate::router::Invocation;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Captured output of a child that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the child was terminated by a signal
    pub exit_code: i32,
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub async fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<ProcessOutput> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GatewayError::Spawn {
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!(?pid, invocation = %invocation, "spawned child");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completed = tokio::time::timeout(timeout, async {
            tokio::try_join!(read_pipe(stdout), read_pipe(stderr), child.wait())
        })
        .await;

        match completed {
            Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code: status.code().unwrap_or(-1),
            }),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(GatewayError::Io(e))
            }
            Err(_) => {
                // kill() also waits, so the child is reaped when this returns
                if let Err(e) = child.kill().await {
                    tracing::warn!(?pid, error = %e, "failed to kill timed out child");
                }
                tracing::warn!(?pid, timeout_secs = timeout.as_secs_f64(), "child timed out");
                Err(GatewayError::Timeout(timeout))
            }
        }
    }
}

async fn read_pipe<R>(pipe: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
