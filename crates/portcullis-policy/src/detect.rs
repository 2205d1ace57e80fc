//! Launcher detection
//!
//! Only the first token decides which ecosystem a command belongs to.
//! Anything not in the table is `Unknown`, which the gateway treats as a
//! hard failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Recognized command ecosystems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// npm
    PackageManager,
    /// npx
    PackageExecutor,
    /// pip
    PackageInstaller,
    /// python
    Interpreter,
    Unknown,
}

impl CommandType {
    /// Short launcher name used in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageManager => "npm",
            Self::PackageExecutor => "npx",
            Self::PackageInstaller => "pip",
            Self::Interpreter => "python",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable launcher-name table
#[derive(Debug, Clone)]
pub struct CommandTypeTable {
    launchers: HashMap<String, CommandType>,
}

impl Default for CommandTypeTable {
    fn default() -> Self {
        let mut launchers = HashMap::new();

        for (name, ty) in [
            ("npm", CommandType::PackageManager),
            ("npm.cmd", CommandType::PackageManager),
            ("npx", CommandType::PackageExecutor),
            ("npx.cmd", CommandType::PackageExecutor),
            ("pip", CommandType::PackageInstaller),
            ("pip3", CommandType::PackageInstaller),
            ("python", CommandType::Interpreter),
            ("python3", CommandType::Interpreter),
            ("python.exe", CommandType::Interpreter),
        ] {
            launchers.insert(name.to_string(), ty);
        }

        Self { launchers }
    }
}

impl CommandTypeTable {
    /// Build a table from explicit (launcher, type) pairs
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CommandType)>,
        S: Into<String>,
    {
        let launchers = entries
            .into_iter()
            .filter(|(_, ty)| *ty != CommandType::Unknown)
            .map(|(name, ty)| (name.into().to_lowercase(), ty))
            .collect();
        Self { launchers }
    }

    /// Classify an argument vector by its first token
    pub fn detect<S: AsRef<str>>(&self, argv: &[S]) -> CommandType {
        let Some(first) = argv.first() else {
            return CommandType::Unknown;
        };
        self.launchers
            .get(&first.as_ref().to_lowercase())
            .copied()
            .unwrap_or(CommandType::Unknown)
    }

    /// Ecosystems this table recognizes, in a stable order
    pub fn supported(&self) -> Vec<CommandType> {
        [
            CommandType::PackageManager,
            CommandType::PackageExecutor,
            CommandType::PackageInstaller,
            CommandType::Interpreter,
        ]
        .into_iter()
        .filter(|ty| self.launchers.values().any(|t| t == ty))
        .collect()
    }

    /// "npm, npx, pip, or python"
    pub fn supported_list(&self) -> String {
        let names: Vec<&str> = self.supported().iter().map(|t| t.as_str()).collect();
        match names.as_slice() {
            [] => String::from("(none)"),
            [only] => only.to_string(),
            [init @ .., last] => format!("{}, or {}", init.join(", "), last),
        }
    }
}
