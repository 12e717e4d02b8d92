use crate::config;
use crate::error::LaunchError;
use crate::paths::InstallPaths;
use skiff_runtime::{RunResult, RuntimeHost, TerminationOutcome};
use std::io::{self, Write};
use tracing::debug;

/// Printed between launcher diagnostics and application output, and again
/// ahead of the abnormal-termination banner.
pub const SEPARATOR: &str =
    "---------------------------------------------------------------------------";

/// Banner shown when the entry module ends with an uncaught error.
pub const ABNORMAL_BANNER: &str = "Application quit abnormally!";

/// The whole launch pipeline: resolve the install layout, build the
/// isolated configuration, start the runtime, register the app packages
/// directory, run the entry module, and tear the runtime down.
///
/// Returns the classified termination for the caller to map to an exit
/// status; every failure site short-circuits with its own [`LaunchError`].
pub fn launch(argv: Vec<String>) -> Result<TerminationOutcome, LaunchError> {
    let paths = InstallPaths::resolve()?;
    debug!("install root: {}", paths.root.display());

    let runtime_config = config::build_config(&paths, argv)?;
    let host = RuntimeHost::start(runtime_config)?;

    let outcome = run_app(&host, &paths);
    // Teardown runs on every path once startup succeeded
    host.shutdown();
    outcome
}

fn run_app(host: &RuntimeHost, paths: &InstallPaths) -> Result<TerminationOutcome, LaunchError> {
    debug!(
        "adding app packages directory: {}",
        paths.app_packages_dir.display()
    );
    host.add_site_dir(&paths.app_packages_dir)?;

    debug!("running app module: {}", host.main_module());
    debug!("{SEPARATOR}");
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    let run = host.run_main()?;
    report(&run);
    Ok(run.outcome)
}

// The banner goes to stdout before the detail goes to stderr, so an
// operator reading a combined capture sees the verdict first.
fn report(run: &RunResult) {
    if run.outcome == TerminationOutcome::UncaughtFailure {
        println!("{SEPARATOR}");
        println!("{ABNORMAL_BANNER}");
        let _ = io::stdout().flush();
    }
    if let Some(detail) = &run.detail {
        eprintln!("{detail}");
    }
}
