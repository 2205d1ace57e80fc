//! Gateway configuration
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! Values may reference environment variables as `${NAME}`.

use anyhow::Context;
use portcullis_policy::{ConfinementError, PolicyError, WorkspaceRoot};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_WORKSPACE: &str = "PORTCULLIS_WORKSPACE";
pub const ENV_VENV: &str = "PORTCULLIS_VENV";
pub const ENV_TIMEOUT_SECS: &str = "PORTCULLIS_TIMEOUT_SECS";

/// Errors building a [`Gateway`](crate::Gateway) from a config
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Workspace error: {0}")]
    Workspace(#[from] ConfinementError),

    #[error("Hazard policy error: {0}")]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Directory every command runs in and every path must resolve into
    pub workspace_root: PathBuf,
    /// Isolated interpreter environment; `<workspace_root>/venv` when unset
    pub environment_dir: Option<PathBuf>,
    pub default_timeout_secs: u64,
    /// Upper bound for timeouts requested through the tool surface
    pub max_timeout_secs: u64,
    pub bootstrap_timeout_secs: u64,
    /// Output budget when rendering results for the planner
    pub max_output_bytes: usize,
    /// Fallback interpreter when no isolated environment exists
    pub system_interpreter: String,
    /// Fallback installer when no isolated environment exists
    pub system_installer: String,
    pub package_manager: String,
    pub package_executor: String,
    /// Appended to the built-in hazard deny-list
    pub extra_hazard_patterns: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("workspace"),
            environment_dir: None,
            default_timeout_secs: 60,
            max_timeout_secs: 600,
            bootstrap_timeout_secs: 120,
            max_output_bytes: 64 * 1024, // 64KB
            system_interpreter: default_interpreter().to_string(),
            system_installer: "pip".to_string(),
            package_manager: default_launcher("npm"),
            package_executor: default_launcher("npx"),
            extra_hazard_patterns: Vec::new(),
        }
    }
}

fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// npm ships as a batch script on Windows
fn default_launcher(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.cmd")
    } else {
        name.to_string()
    }
}

impl GatewayConfig {
    /// Defaults rooted at `workspace_root`
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file, expanding `${ENV_VAR}` references
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let expanded = shellexpand::env(content)?;
        let config: GatewayConfig = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Defaults overridden by `PORTCULLIS_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_WORKSPACE) {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(venv) = lookup(ENV_VENV) {
            self.environment_dir = Some(PathBuf::from(venv));
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.default_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))?;
        }
        Ok(self)
    }

    /// Where the isolated environment lives (or would be created).
    ///
    /// Unset means `venv` under the opened workspace. A relative setting is
    /// taken from the current directory, like `workspace_root` itself.
    pub fn resolve_environment_dir(&self, workspace: &WorkspaceRoot) -> PathBuf {
        match &self.environment_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => std::env::current_dir()
                .map(|cwd| cwd.join(dir))
                .unwrap_or_else(|_| dir.clone()),
            None => workspace.path().join("venv"),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrap_timeout_secs)
    }
}
