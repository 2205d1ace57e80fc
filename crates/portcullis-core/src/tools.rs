//! Planner-facing tool surface
//!
//! The planner sees the gateway as a single `execute_command` function in
//! an OpenAI-compatible schema. Arguments arrive as JSON; the answer goes
//! back as text.

use crate::command::{Command, ExecutionResult};
use crate::gateway::Gateway;
use serde_json::Value;
use std::time::Duration;

pub const TOOL_NAME: &str = "execute_command";

/// Schema for the `execute_command` tool
pub fn tool_schema() -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Execute an npm, npx, pip or python command inside the workspace and return its output. \
                No shell is involved: pipes, redirection, command chaining, `..` and localhost addresses are rejected. \
                Script paths passed to python must stay inside the workspace.",
            "parameters": {
                "type": "object",
                "properties": {
                    "command": {
                        "description": "The command, either as one string or as an array of arguments",
                        "oneOf": [
                            { "type": "string" },
                            { "type": "array", "items": { "type": "string" } }
                        ]
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Maximum run time in seconds (default 60)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Why this command is being run"
                    }
                },
                "required": ["command"]
            }
        }
    })
}

/// Bad tool arguments
#[derive(Debug, thiserror::Error)]
pub enum ToolArgsError {
    #[error("'command' is required")]
    MissingCommand,
    #[error("'command' must be a string or an array of strings")]
    InvalidCommand,
    #[error("'timeout' must be a positive integer number of seconds")]
    InvalidTimeout,
    #[error("'description' must be a string")]
    InvalidDescription,
}

/// Parsed `execute_command` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub command: Command,
    pub timeout_secs: Option<u64>,
    pub description: Option<String>,
}

impl ToolRequest {
    pub fn from_args(args: &Value) -> Result<Self, ToolArgsError> {
        let command = match args.get("command") {
            None | Some(Value::Null) => return Err(ToolArgsError::MissingCommand),
            Some(Value::String(text)) => Command::Text(text.clone()),
            Some(Value::Array(items)) => Command::Argv(
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ToolArgsError::InvalidCommand)?,
            ),
            Some(_) => return Err(ToolArgsError::InvalidCommand),
        };

        let timeout_secs = match args.get("timeout") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(secs) if secs > 0 => Some(secs),
                _ => return Err(ToolArgsError::InvalidTimeout),
            },
        };

        let description = match args.get("description") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ToolArgsError::InvalidDescription),
        };

        Ok(Self {
            command,
            timeout_secs,
            description,
        })
    }

    /// Requested timeout, capped at `max_secs`
    pub fn timeout(&self, max_secs: u64) -> Option<Duration> {
        self.timeout_secs
            .map(|secs| Duration::from_secs(secs.min(max_secs)))
    }
}

/// Run the tool and render the result for the planner
pub async fn execute_tool(gateway: &Gateway, args: &Value) -> String {
    let request = match ToolRequest::from_args(args) {
        Ok(request) => request,
        Err(e) => return format!("Invalid arguments: {}", e),
    };

    let config = gateway.config();
    let result = gateway
        .execute(
            request.command.clone(),
            request.timeout(config.max_timeout_secs),
            request.description.as_deref(),
        )
        .await;

    render(&result, config.max_output_bytes)
}

/// Text form of a result, with each stream cut to `max_bytes`
pub fn render(result: &ExecutionResult, max_bytes: usize) -> String {
    ExecutionResult {
        stdout: truncate(&result.stdout, max_bytes),
        stderr: truncate(&result.stderr, max_bytes),
        ..result.clone()
    }
    .to_string()
}

fn truncate(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...\n[truncated, {} bytes total]", &text[..end], text.len())
}
