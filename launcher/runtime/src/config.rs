use std::path::PathBuf;

/// Environment variable listing extra module search directories, separated by
/// the platform's path-list separator. Consulted only when the config is not
/// isolated.
pub const MODULE_PATH_ENV: &str = "SKIFF_PATH";

/// Accumulated startup options for a [`crate::RuntimeHost`].
///
/// Built field by field by the embedder and consumed once by
/// [`crate::RuntimeHost::start`]. The two constructors are presets; every
/// field stays public so policy decisions read as plain assignments at the
/// call site.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Ignore ambient host configuration ([`MODULE_PATH_ENV`]) entirely.
    pub isolated: bool,
    /// Line-buffer host-side writers. When false, stdout/stderr are flushed
    /// after every write so launcher diagnostics and app output interleave
    /// in execution order.
    pub buffered_stdio: bool,
    /// Write a `.jsc` bytecode cache next to each `.js` module as it loads.
    pub write_bytecode: bool,
    /// Evaluate `site.js` from each search directory during startup.
    pub site_import: bool,
    /// Path of the hosting executable, exposed to the app as `Skiff.execPath`.
    pub executable: PathBuf,
    /// Bare specifier of the module run by [`crate::RuntimeHost::run_main`].
    pub main_module: String,
    /// Ordered module search directories.
    pub module_search_paths: Vec<PathBuf>,
    /// Process argument vector, exposed to the app as `Skiff.args`.
    pub argv: Vec<String>,
}

impl RuntimeConfig {
    /// Default preset: ambient [`MODULE_PATH_ENV`] honored, buffered stdio,
    /// bytecode cache writes and site imports enabled.
    pub fn new(executable: PathBuf) -> Self {
        Self {
            isolated: false,
            buffered_stdio: true,
            write_bytecode: true,
            site_import: true,
            executable,
            main_module: String::new(),
            module_search_paths: Vec::new(),
            argv: Vec::new(),
        }
    }

    /// Isolation preset: identical to [`RuntimeConfig::new`] except the host
    /// environment contributes nothing to module resolution.
    pub fn isolated(executable: PathBuf) -> Self {
        Self {
            isolated: true,
            ..Self::new(executable)
        }
    }
}
