//! Native launcher for a packaged application.
//!
//! Derives the installation layout from its own symlink-resolved location,
//! starts an isolated embedded runtime, registers the bundled dependency
//! directory, runs the app's entry module, and exits with the classified
//! status. See [`launch::launch`] for the pipeline and
//! [`error::LaunchError::exit_code`] for the sentinel table.

pub mod config;
pub mod error;
pub mod error_fmt;
pub mod launch;
pub mod logging;
pub mod paths;
