//! Isolated interpreter environment (a Python venv)
//!
//! Presence is probed on every call, never cached: the bootstrapper may
//! create the environment while the gateway is running.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedEnvironment {
    dir: PathBuf,
}

impl IsolatedEnvironment {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.dir.join("Scripts")
        } else {
            self.dir.join("bin")
        }
    }

    /// Where the interpreter would be
    pub fn interpreter_path(&self) -> PathBuf {
        self.bin_dir().join(exe_name("python"))
    }

    /// Where the companion installer would be
    pub fn installer_path(&self) -> PathBuf {
        self.bin_dir().join(exe_name("pip"))
    }

    /// The interpreter, if it is actually there
    pub fn interpreter(&self) -> Option<PathBuf> {
        present(self.interpreter_path())
    }

    /// The installer, if it is actually there
    pub fn installer(&self) -> Option<PathBuf> {
        present(self.installer_path())
    }
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn present(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
