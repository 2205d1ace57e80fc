//! Gateway error taxonomy
//!
//! None of these reach the caller as an `Err`: [`Gateway`](crate::Gateway)
//! folds each one into an [`ExecutionResult`](crate::ExecutionResult) with
//! exit code [`FAILURE_EXIT_CODE`](crate::FAILURE_EXIT_CODE).

use portcullis_policy::{CommandType, ConfinementError, HazardDenied};
use std::io;
use std::time::Duration;

/// Everything that can stop a command between validation and exit
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Empty command is not allowed")]
    EmptyCommand,

    #[error("{0}")]
    Hazard(HazardDenied),

    #[error("Unknown command type `{token}`. Use: {supported}")]
    UnknownCommandType { token: String, supported: String },

    #[error("{0}")]
    AccessDenied(String),

    #[error("No route for command type `{0}`")]
    Routing(CommandType),

    #[error("Process timed out (>{}s)", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running child: {0}")]
    Io(#[from] io::Error),
}

impl GatewayError {
    /// Rejected before anything was spawned
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyCommand | Self::Hazard(_) | Self::UnknownCommandType { .. }
        )
    }

    /// Text placed on the result's stderr
    pub fn to_stderr(&self) -> String {
        if self.is_validation() {
            format!("Validation error: {self}")
        } else {
            self.to_string()
        }
    }
}

impl From<HazardDenied> for GatewayError {
    fn from(denied: HazardDenied) -> Self {
        match denied {
            HazardDenied::Empty => Self::EmptyCommand,
            other => Self::Hazard(other),
        }
    }
}

impl From<ConfinementError> for GatewayError {
    fn from(err: ConfinementError) -> Self {
        Self::AccessDenied(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
