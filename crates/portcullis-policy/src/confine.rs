//! Workspace confinement
//!
//! Every path argument the gateway hands to a child process must resolve
//! to the workspace root or something below it. Resolution follows
//! symlinks for the parts of the path that exist; a missing tail (a script
//! the planner has not written yet) is resolved lexically. A dangling
//! symlink is refused outright.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Reasons a path cannot be used
#[derive(Debug, thiserror::Error)]
pub enum ConfinementError {
    #[error("Access outside workspace is not allowed: {0}")]
    AccessDenied(String),

    #[error("Workspace root {path} is unusable: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Workspace root {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Canonical, immutable workspace directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot {
    canonical: PathBuf,
}

impl WorkspaceRoot {
    /// Open an existing directory as the workspace root
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ConfinementError> {
        let path = path.as_ref();
        let canonical = path
            .canonicalize()
            .map_err(|source| ConfinementError::InvalidRoot {
                path: path.to_path_buf(),
                source,
            })?;
        if !canonical.is_dir() {
            return Err(ConfinementError::NotADirectory(canonical));
        }
        Ok(Self { canonical })
    }

    pub fn path(&self) -> &Path {
        &self.canonical
    }

    /// Resolve `path` against the root and refuse anything that lands outside it.
    ///
    /// Relative paths are joined onto the root. Absolute paths are taken as
    /// given and must still fall inside the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ConfinementError> {
        let input = Path::new(path);
        let mut resolved = if input.is_absolute() {
            PathBuf::new()
        } else {
            self.canonical.clone()
        };

        for component in input.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    resolved.push(component.as_os_str());
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    // `resolved` is canonical up to here, so popping is exact
                    resolved.pop();
                }
                Component::Normal(segment) => {
                    resolved.push(segment);
                    match resolved.canonicalize() {
                        Ok(real) => resolved = real,
                        // A dangling link can point anywhere once its target appears
                        Err(_) if resolved.is_symlink() => {
                            tracing::warn!(
                                requested = path,
                                link = %resolved.display(),
                                "dangling symlink in path"
                            );
                            return Err(ConfinementError::AccessDenied(path.to_string()));
                        }
                        Err(_) => {}
                    }
                }
            }
        }

        if resolved.starts_with(&self.canonical) {
            Ok(resolved)
        } else {
            tracing::warn!(
                requested = path,
                resolved = %resolved.display(),
                "path escapes workspace root"
            );
            Err(ConfinementError::AccessDenied(path.to_string()))
        }
    }

    /// True if `path` resolves inside the root
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }
}
