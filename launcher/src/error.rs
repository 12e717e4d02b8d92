use crate::config::ConfigError;
use crate::paths::PathsError;
use skiff_runtime::{RunError, SiteDirError, StartError, TerminationOutcome};
use thiserror::Error;

/// Exit code for an entry module that ends with an uncaught error.
pub const ABNORMAL_TERMINATION_CODE: i32 = -6;

/// A failure at any site of the launch pipeline.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("could not determine the launcher's install location")]
    Paths(#[from] PathsError),
    #[error("invalid runtime configuration")]
    Config(#[from] ConfigError),
    #[error("could not start the embedded runtime")]
    Start(#[from] StartError),
    #[error("could not register the app packages directory")]
    SiteDir(#[from] SiteDirError),
    #[error("entry module run failed")]
    Run(#[from] RunError),
}

impl LaunchError {
    /// Sentinel exit code for this failure site.
    ///
    /// Every site gets its own fixed code so an operator can tell "the
    /// runtime would not start" apart from "the app itself failed" from the
    /// exit status alone.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Paths(_) => -1,
            Self::Config(_) => -2,
            Self::Start(StartError::PreInit(_)) => -3,
            Self::Start(StartError::Init(_)) => -4,
            Self::Run(RunError::StateUnavailable) => -5,
            Self::Run(RunError::ExitCodeUnreadable(_)) => -10,
            Self::SiteDir(SiteDirError::RegistryMissing) => -11,
            Self::SiteDir(SiteDirError::HookMissing) => -12,
            Self::SiteDir(SiteDirError::PathEncoding(_)) => -13,
            Self::SiteDir(SiteDirError::ValueConversion(_)) => -14,
            Self::SiteDir(SiteDirError::Invocation(_)) => -15,
        }
    }
}

/// Maps a classified termination to the final process exit status.
pub fn process_exit_code(outcome: TerminationOutcome) -> i32 {
    match outcome {
        TerminationOutcome::Success => 0,
        TerminationOutcome::ExplicitCode(code) => code,
        TerminationOutcome::UncaughtFailure => ABNORMAL_TERMINATION_CODE,
    }
}
