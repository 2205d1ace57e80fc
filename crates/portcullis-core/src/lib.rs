//! Portcullis Core - the command execution gateway
//!
//! An autonomous planner hands the [`Gateway`] a command. It is scanned
//! against the hazard deny-list, classified by launcher, routed to an
//! interpreter (isolated environment first), and run without a shell,
//! inside the workspace, under a timeout. Whatever happens, the caller gets
//! an [`ExecutionResult`] back.

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod router;
pub mod runner;
pub mod tools;

pub use bootstrap::EnvironmentBootstrapper;
pub use command::{Command, ExecutionResult, FAILURE_EXIT_CODE};
pub use config::{ConfigError, GatewayConfig};
pub use environment::IsolatedEnvironment;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use router::{Invocation, Router};
pub use runner::{ProcessOutput, ProcessRunner};
pub use tools::{execute_tool, tool_schema, ToolArgsError, ToolRequest};

pub use portcullis_policy;
