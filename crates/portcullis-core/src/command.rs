//! Command input and the uniform execution result

use portcullis_policy::CommandType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code reported for every outcome the child never produced itself
pub const FAILURE_EXIT_CODE: i32 = -1;

/// A command as the planner sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Free text, split on whitespace. No quoting rules apply.
    Text(String),
    /// Pre-split argument vector
    Argv(Vec<String>),
}

impl Command {
    /// One string for hazard scanning: vector arguments joined by spaces
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Argv(argv) => argv.join(" "),
        }
    }

    /// Argument vector for detection and routing
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Text(text) => text.split_whitespace().map(str::to_string).collect(),
            Self::Argv(argv) => argv.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for Command {
    fn from(argv: Vec<String>) -> Self {
        Self::Argv(argv)
    }
}

impl From<&[&str]> for Command {
    fn from(argv: &[&str]) -> Self {
        Self::Argv(argv.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Command {
    fn from(argv: [&str; N]) -> Self {
        Self::Argv(argv.iter().map(|s| s.to_string()).collect())
    }
}

/// What the planner gets back, whatever happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// The command exactly as it was submitted
    pub command: Command,
    pub command_type: CommandType,
}

impl ExecutionResult {
    /// A result for something the gateway refused or could not finish
    pub fn failure(command: Command, command_type: CommandType, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: FAILURE_EXIT_CODE,
            command,
            command_type,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success() { "SUCCESS" } else { "FAILED" };
        writeln!(f, "{} [{}]", status, self.command_type.as_str().to_uppercase())?;
        writeln!(f, "Command: {}", self.command)?;
        write!(f, "Exit Code: {}", self.exit_code)?;
        if !self.stdout.is_empty() {
            write!(f, "\n\n[OUTPUT]\n{}", self.stdout.trim_end())?;
        }
        if !self.stderr.is_empty() {
            write!(f, "\n\n[ERROR]\n{}", self.stderr.trim_end())?;
        }
        Ok(())
    }
}
