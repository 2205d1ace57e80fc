//! Environment bootstrap
//!
//! Creates the isolated environment with `<system interpreter> -m venv`.
//! Idempotent: if the directory is already there nothing is touched.

use crate::command::{Command, ExecutionResult};
use crate::environment::IsolatedEnvironment;
use crate::router::Invocation;
use crate::runner::ProcessRunner;
use portcullis_policy::CommandType;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct EnvironmentBootstrapper {
    environment: IsolatedEnvironment,
    system_interpreter: String,
    runner: ProcessRunner,
    timeout: Duration,
    /// Serializes check-then-create across concurrent callers
    lock: Mutex<()>,
}

impl EnvironmentBootstrapper {
    pub fn new(
        environment: IsolatedEnvironment,
        system_interpreter: impl Into<String>,
        runner: ProcessRunner,
        timeout: Duration,
    ) -> Self {
        Self {
            environment,
            system_interpreter: system_interpreter.into(),
            runner,
            timeout,
            lock: Mutex::new(()),
        }
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(
            &self.system_interpreter,
            [
                "-m".into(),
                "venv".into(),
                self.environment.dir().as_os_str().to_os_string(),
            ],
        )
    }

    pub async fn bootstrap(&self) -> ExecutionResult {
        let _guard = self.lock.lock().await;

        let invocation = self.invocation();
        let command = Command::Text(invocation.to_string());

        if self.environment.exists() {
            tracing::info!(dir = %self.environment.dir().display(), "isolated environment already present");
            return ExecutionResult {
                stdout: format!(
                    "Virtual environment already exists at {}",
                    self.environment.dir().display()
                ),
                stderr: String::new(),
                exit_code: 0,
                command,
                command_type: CommandType::Interpreter,
            };
        }

        tracing::info!(dir = %self.environment.dir().display(), "creating isolated environment");
        match self.runner.run(&invocation, self.timeout).await {
            Ok(output) => {
                if output.exit_code != 0 {
                    tracing::warn!(exit_code = output.exit_code, "environment creation failed");
                }
                ExecutionResult {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.exit_code,
                    command,
                    command_type: CommandType::Interpreter,
                }
            }
            Err(e) => ExecutionResult::failure(command, CommandType::Interpreter, e.to_stderr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn bootstrapper(tmp: &TempDir, interpreter: &str) -> EnvironmentBootstrapper {
        EnvironmentBootstrapper::new(
            IsolatedEnvironment::new(tmp.path().join("venv")),
            interpreter,
            ProcessRunner::new(tmp.path()),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_existing_environment_is_untouched() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("venv")).unwrap();
        let modified = |p: &std::path::Path| -> SystemTime {
            std::fs::metadata(p).unwrap().modified().unwrap()
        };
        let before = modified(&tmp.path().join("venv"));

        // A missing interpreter proves nothing was spawned
        let boot = bootstrapper(&tmp, "portcullis-no-such-python");
        let first = boot.bootstrap().await;
        let second = boot.bootstrap().await;

        assert!(first.success() && second.success());
        assert!(first.stdout.contains("already exists"));
        assert_eq!(first, second);
        assert_eq!(modified(&tmp.path().join("venv")), before);
        assert_eq!(std::fs::read_dir(tmp.path().join("venv")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_normalized() {
        let tmp = TempDir::new().unwrap();
        let boot = bootstrapper(&tmp, "portcullis-no-such-python");

        let result = boot.bootstrap().await;
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("Failed to start"));
        assert_eq!(result.command_type, CommandType::Interpreter);
        assert!(!tmp.path().join("venv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_creates_then_becomes_noop() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        // Stand-in for `python -m venv DIR`: creates DIR and counts invocations
        let fake = tmp.path().join("fake-python");
        std::fs::write(&fake, "#!/bin/sh\nmkdir \"$3\"\necho run >> calls.log\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let boot = bootstrapper(&tmp, fake.to_str().unwrap());
        let first = boot.bootstrap().await;
        assert!(first.success(), "{first}");
        assert!(tmp.path().join("venv").is_dir());

        let second = boot.bootstrap().await;
        assert!(second.success());
        assert!(second.stdout.contains("already exists"));

        let calls = std::fs::read_to_string(tmp.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_bootstrap_creates_once() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Arc;

        let tmp = TempDir::new().unwrap();
        let fake = tmp.path().join("fake-python");
        std::fs::write(&fake, "#!/bin/sh\nsleep 0.2\nmkdir \"$3\"\necho run >> calls.log\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let boot = Arc::new(bootstrapper(&tmp, fake.to_str().unwrap()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let boot = Arc::clone(&boot);
                tokio::spawn(async move { boot.bootstrap().await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().success());
        }

        let calls = std::fs::read_to_string(tmp.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }
}
