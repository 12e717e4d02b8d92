use crate::paths::InstallPaths;
use skiff_runtime::RuntimeConfig;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Enables verbose diagnostics when present in the environment, regardless
/// of value.
pub const DEBUG_ENV: &str = "DEBUG_MODE";

/// Overrides the entry-module name. Absent or empty falls back to
/// [`DEFAULT_MAIN_MODULE`].
pub const MAIN_MODULE_ENV: &str = "MAIN_MODULE_OVERRIDE";

/// Entry module of the packaged application.
pub const DEFAULT_MAIN_MODULE: &str = "main";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entry module override is not valid UTF-8")]
    ModuleNameEncoding,
    #[error("install path is not valid UTF-8: {}", .0.display())]
    PathEncoding(PathBuf),
}

/// Assembles the isolated runtime configuration for an installation.
///
/// Everything the runtime will consult is decided here: nothing ambient
/// leaks in past this point except the entry-module override itself.
pub fn build_config(paths: &InstallPaths, argv: Vec<String>) -> Result<RuntimeConfig, ConfigError> {
    let main_module = resolve_main_module(env::var_os(MAIN_MODULE_ENV))?;

    let mut config = RuntimeConfig::isolated(paths.executable.clone());
    // Launcher diagnostics and app output must interleave in real order
    config.buffered_stdio = false;
    // The installation tree may be read-only or signed; never write caches
    config.write_bytecode = false;
    // No implicit startup customization
    config.site_import = false;
    config.main_module = main_module;
    config.module_search_paths = vec![
        paths.stdlib_dir.clone(),
        paths.stdlib_compiled_dir.clone(),
        paths.app_dir.clone(),
    ];
    config.argv = argv;

    require_utf8(&config.executable)?;
    for dir in &config.module_search_paths {
        require_utf8(dir)?;
    }

    debug!("config.executable: {}", config.executable.display());
    debug!("config.main_module: {}", config.main_module);
    debug!("module search path:");
    for dir in &config.module_search_paths {
        debug!("- {}", dir.display());
    }
    debug!("forwarding {} process arguments", config.argv.len());

    Ok(config)
}

/// Entry-module resolution order: environment override when set and
/// non-empty, fixed default otherwise.
fn resolve_main_module(override_value: Option<OsString>) -> Result<String, ConfigError> {
    match override_value {
        None => Ok(DEFAULT_MAIN_MODULE.to_string()),
        Some(value) => {
            let name = value
                .into_string()
                .map_err(|_| ConfigError::ModuleNameEncoding)?;
            if name.is_empty() {
                Ok(DEFAULT_MAIN_MODULE.to_string())
            } else {
                Ok(name)
            }
        }
    }
}

// The engine consumes paths as strings; refuse anything that will not
// survive the conversion.
fn require_utf8(path: &Path) -> Result<(), ConfigError> {
    if path.to_str().is_none() {
        return Err(ConfigError::PathEncoding(path.to_path_buf()));
    }
    Ok(())
}
