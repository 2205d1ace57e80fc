//! The gateway: validate → classify → route → execute
//!
//! Strictly linear and fail-fast. Every stage returns a `Result`; the
//! public entry points fold any error into an [`ExecutionResult`] so the
//! planner always gets the same shape back. Retrying is the planner's job.

use crate::bootstrap::EnvironmentBootstrapper;
use crate::command::{Command, ExecutionResult};
use crate::config::{ConfigError, GatewayConfig};
use crate::environment::IsolatedEnvironment;
use crate::error::{GatewayError, Result};
use crate::router::{Invocation, Router};
use crate::runner::{ProcessOutput, ProcessRunner};
use portcullis_policy::{CommandType, CommandTypeTable, HazardPolicy, WorkspaceRoot};
use std::time::Duration;
use tracing::Instrument;

pub struct Gateway {
    hazards: HazardPolicy,
    launchers: CommandTypeTable,
    router: Router,
    runner: ProcessRunner,
    bootstrapper: EnvironmentBootstrapper,
    config: GatewayConfig,
}

impl Gateway {
    /// Build a gateway. The workspace root must already exist.
    pub fn new(config: GatewayConfig) -> std::result::Result<Self, ConfigError> {
        let hazards = HazardPolicy::with_extra_patterns(&config.extra_hazard_patterns)?;
        Self::with_policy(config, hazards, CommandTypeTable::default())
    }

    /// Build a gateway with an explicit deny-list and launcher table
    pub fn with_policy(
        config: GatewayConfig,
        hazards: HazardPolicy,
        launchers: CommandTypeTable,
    ) -> std::result::Result<Self, ConfigError> {
        let workspace = WorkspaceRoot::new(&config.workspace_root)?;
        let environment = IsolatedEnvironment::new(config.resolve_environment_dir(&workspace));
        let runner = ProcessRunner::new(workspace.path());
        let bootstrapper = EnvironmentBootstrapper::new(
            environment.clone(),
            config.system_interpreter.clone(),
            runner.clone(),
            config.bootstrap_timeout(),
        );
        let router = Router::new(workspace, environment, &config);

        tracing::info!(
            workspace = %router.workspace().path().display(),
            environment = %router.environment().dir().display(),
            rules = hazards.rules().len(),
            "gateway ready"
        );

        Ok(Self {
            hazards,
            launchers,
            router,
            runner,
            bootstrapper,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn workspace(&self) -> &WorkspaceRoot {
        self.router.workspace()
    }

    pub fn environment(&self) -> &IsolatedEnvironment {
        self.router.environment()
    }

    /// Run one command to completion. Never fails: errors come back as a
    /// result with exit code `-1` and the reason on stderr.
    pub async fn execute(
        &self,
        command: impl Into<Command>,
        timeout: Option<Duration>,
        description: Option<&str>,
    ) -> ExecutionResult {
        let command = command.into();
        let timeout = timeout.unwrap_or_else(|| self.config.default_timeout());
        let span = tracing::info_span!(
            "execute",
            id = %uuid::Uuid::new_v4(),
            description = description.unwrap_or(""),
        );

        async move {
            let (command_type, outcome) = match self.admit(&command) {
                Ok((command_type, argv)) => {
                    (command_type, self.dispatch(&argv, command_type, timeout).await)
                }
                Err(e) => (CommandType::Unknown, Err(e)),
            };

            match outcome {
                Ok(output) => {
                    tracing::info!(%command_type, exit_code = output.exit_code, "command finished");
                    ExecutionResult {
                        stdout: output.stdout,
                        stderr: output.stderr,
                        exit_code: output.exit_code,
                        command,
                        command_type,
                    }
                }
                Err(e) => {
                    if e.is_validation() {
                        tracing::warn!(error = %e, "command rejected");
                    } else {
                        tracing::warn!(%command_type, error = %e, "command failed");
                    }
                    ExecutionResult::failure(command, command_type, e.to_stderr())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Create the isolated environment if it is missing
    pub async fn bootstrap_environment(&self) -> ExecutionResult {
        self.bootstrapper.bootstrap().await
    }

    /// Validate, classify and route without running anything
    pub fn plan(&self, command: &Command) -> Result<(CommandType, Invocation)> {
        let (command_type, argv) = self.admit(command)?;
        let invocation = self.router.route(&argv, command_type)?;
        Ok((command_type, invocation))
    }

    /// Hazard scan, then launcher detection
    fn admit(&self, command: &Command) -> Result<(CommandType, Vec<String>)> {
        self.hazards.check(&command.normalized())?;
        let argv = command.argv();
        match self.launchers.detect(&argv) {
            CommandType::Unknown => Err(GatewayError::UnknownCommandType {
                token: argv.first().cloned().unwrap_or_default(),
                supported: self.launchers.supported_list(),
            }),
            known => Ok((known, argv)),
        }
    }

    async fn dispatch(
        &self,
        argv: &[String],
        command_type: CommandType,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        let invocation = self.router.route(argv, command_type)?;
        tracing::info!(%command_type, invocation = %invocation, "executing");
        self.runner.run(&invocation, timeout).await
    }
}
