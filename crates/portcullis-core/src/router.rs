//! Interpreter routing
//!
//! Turns a validated argument vector into the concrete program + arguments
//! to spawn. The isolated environment is preferred whenever it exists;
//! system binaries are the fallback, never an error.

use crate::config::GatewayConfig;
use crate::environment::IsolatedEnvironment;
use crate::error::{GatewayError, Result};
use portcullis_policy::{CommandType, WorkspaceRoot};
use std::ffi::{OsStr, OsString};
use std::fmt;

/// A concrete, discrete argument vector. Never joined into a shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .argv()
            .into_iter()
            .map(|part| part.to_string_lossy().into_owned())
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Maps (argv, type) to an [`Invocation`]
#[derive(Debug, Clone)]
pub struct Router {
    workspace: WorkspaceRoot,
    environment: IsolatedEnvironment,
    package_manager: String,
    package_executor: String,
    system_interpreter: String,
    system_installer: String,
}

impl Router {
    pub fn new(
        workspace: WorkspaceRoot,
        environment: IsolatedEnvironment,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            workspace,
            environment,
            package_manager: config.package_manager.clone(),
            package_executor: config.package_executor.clone(),
            system_interpreter: config.system_interpreter.clone(),
            system_installer: config.system_installer.clone(),
        }
    }

    pub fn workspace(&self) -> &WorkspaceRoot {
        &self.workspace
    }

    pub fn environment(&self) -> &IsolatedEnvironment {
        &self.environment
    }

    pub fn route(&self, argv: &[String], command_type: CommandType) -> Result<Invocation> {
        let Some((_, rest)) = argv.split_first() else {
            return Err(GatewayError::EmptyCommand);
        };

        let invocation = match command_type {
            CommandType::PackageManager => Invocation::new(&self.package_manager, rest),
            CommandType::PackageExecutor => Invocation::new(&self.package_executor, rest),
            CommandType::PackageInstaller => self.route_installer(rest),
            CommandType::Interpreter => self.route_interpreter(rest)?,
            CommandType::Unknown => {
                tracing::error!(%command_type, "router has no route for detected type");
                return Err(GatewayError::Routing(command_type));
            }
        };

        tracing::debug!(%command_type, invocation = %invocation, "routed command");
        Ok(invocation)
    }

    /// Isolated pip → isolated `python -m pip` → system pip
    fn route_installer(&self, rest: &[String]) -> Invocation {
        if let Some(python) = self.environment.interpreter() {
            if let Some(pip) = self.environment.installer() {
                return Invocation::new(pip, rest);
            }
            let args = ["-m", "pip"]
                .into_iter()
                .map(OsString::from)
                .chain(rest.iter().map(OsString::from));
            return Invocation::new(python, args);
        }
        Invocation::new(&self.system_installer, rest)
    }

    /// A leading non-flag argument is treated as a script path and confined
    fn route_interpreter(&self, rest: &[String]) -> Result<Invocation> {
        let program: OsString = match self.environment.interpreter() {
            Some(python) => python.into_os_string(),
            None => OsString::from(&self.system_interpreter),
        };

        let mut args: Vec<OsString> = rest.iter().map(OsString::from).collect();
        if let Some(script) = rest.first().filter(|arg| !arg.starts_with('-')) {
            let confined = self.workspace.resolve(script)?;
            args[0] = confined.into_os_string();
        }

        Ok(Invocation { program, args })
    }
}
