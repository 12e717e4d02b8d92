//! Embedding layer around a QuickJS engine for packaged applications.
//!
//! A host is started from an accumulated [`RuntimeConfig`], runs exactly one
//! entry module, and reports how that module terminated. The library never
//! exits the process: explicit exit requests from the application travel as
//! values (`Skiff.exit` throws an `ExitStatus`) and are classified into a
//! [`TerminationOutcome`] for the embedder to act on.

mod config;
mod globals;
mod host;
mod loader;
mod outcome;

// Embedders see rquickjs types in this crate's error surface; re-export the
// matching version.
pub use rquickjs;

pub use config::{MODULE_PATH_ENV, RuntimeConfig};
pub use host::{RuntimeHost, SiteDirError, StartError};
pub use loader::SearchPaths;
pub use outcome::{RunError, RunResult, TerminationOutcome};
