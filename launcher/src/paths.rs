use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why the installation layout could not be derived.
#[derive(Debug, Error)]
pub enum PathsError {
    #[error("could not resolve the launcher executable's real path")]
    Locate(#[source] io::Error),
    #[error("executable at {} has no install root two levels up", .0.display())]
    NoRoot(PathBuf),
}

/// Filesystem layout of an installed application, derived once from the
/// launcher's own resolved location and immutable afterward:
///
/// ```text
/// <root>/bin/skiff            the launcher itself
/// <root>/lib/std              standard library modules
/// <root>/lib/std/compiled     precompiled standard library
/// <root>/lib/app              application code
/// <root>/lib/app_packages     bundled third-party dependencies
/// ```
#[derive(Debug, Clone)]
pub struct InstallPaths {
    pub executable: PathBuf,
    pub bin_dir: PathBuf,
    pub root: PathBuf,
    pub stdlib_dir: PathBuf,
    pub stdlib_compiled_dir: PathBuf,
    pub app_dir: PathBuf,
    pub app_packages_dir: PathBuf,
}

impl InstallPaths {
    /// Locates the running executable, resolves symlinks, and derives the
    /// install layout. The root is two directory levels above the
    /// executable's real location.
    pub fn resolve() -> Result<Self, PathsError> {
        let executable = std::env::current_exe()
            .and_then(|exe| exe.canonicalize())
            .map_err(PathsError::Locate)?;
        Self::from_executable(executable)
    }

    pub(crate) fn from_executable(executable: PathBuf) -> Result<Self, PathsError> {
        let bin_dir = executable
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PathsError::NoRoot(executable.clone()))?;
        let root = bin_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PathsError::NoRoot(executable.clone()))?;

        let lib_dir = root.join("lib");
        let stdlib_dir = lib_dir.join("std");
        Ok(Self {
            stdlib_compiled_dir: stdlib_dir.join("compiled"),
            app_dir: lib_dir.join("app"),
            app_packages_dir: lib_dir.join("app_packages"),
            executable,
            bin_dir,
            root,
            stdlib_dir,
        })
    }
}
