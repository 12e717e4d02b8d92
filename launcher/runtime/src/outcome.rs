use rquickjs::{CaughtError, Exception, Value};
use thiserror::Error;

/// `name` property marking a thrown value as an exit request. Assigned by
/// the bundled bootstrap's `ExitStatus` class.
const EXIT_STATUS_NAME: &str = "ExitStatus";

/// How the entry module ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// Ran to completion, or exited with an empty payload.
    Success,
    /// Exit request carrying a numeric status.
    ExplicitCode(i32),
    /// An uncaught error reached the top level.
    UncaughtFailure,
}

/// A classified run, plus the error detail to re-surface on stderr when the
/// run left any behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub outcome: TerminationOutcome,
    pub detail: Option<String>,
}

impl RunResult {
    pub(crate) fn success() -> Self {
        Self {
            outcome: TerminationOutcome::Success,
            detail: None,
        }
    }
}

/// Failures of the classification itself, as opposed to failures of the
/// application. Both point at a broken host integration.
#[derive(Debug, Error)]
pub enum RunError {
    /// The run failed but the engine exposed no error state at all.
    #[error("entry module failed with no retrievable error state")]
    StateUnavailable,
    /// An exit request was thrown but reading its payload failed.
    #[error("could not read the exit request payload: {0}")]
    ExitCodeUnreadable(String),
}

/// Classifies the caught error state of a failed run.
///
/// Exit requests arrive as thrown `ExitStatus` values. The class does not
/// extend `Error`, so they always surface as [`CaughtError::Value`]; the
/// exception arm is therefore unconditionally an application failure.
pub(crate) fn classify(caught: CaughtError<'_>) -> Result<RunResult, RunError> {
    if let CaughtError::Value(value) = &caught {
        if value.is_undefined() || value.is_null() {
            return Err(RunError::StateUnavailable);
        }
        if let Some(payload) = exit_request_payload(value)? {
            return Ok(exit_result(&payload));
        }
    }

    Ok(RunResult {
        outcome: TerminationOutcome::UncaughtFailure,
        detail: Some(render_caught(&caught)),
    })
}

/// Renders a caught error the way it would appear uncaught: message plus
/// stack for exceptions, debug representation otherwise.
pub(crate) fn render_caught(caught: &CaughtError<'_>) -> String {
    match caught {
        CaughtError::Exception(exception) => render_exception(exception),
        CaughtError::Value(value) => format!("Error: {value:?}"),
        CaughtError::Error(error) => format!("Error: {error:?}"),
    }
}

/// Wraps a value taken from the engine's pending-job error state the way
/// [`rquickjs::CatchResultExt`] would have.
pub(crate) fn caught_from_value(value: Value<'_>) -> CaughtError<'_> {
    match value.clone().into_exception() {
        Some(exception) => CaughtError::Exception(exception),
        None => CaughtError::Value(value),
    }
}

fn exit_request_payload<'js>(value: &Value<'js>) -> Result<Option<Value<'js>>, RunError> {
    let Some(object) = value.as_object() else {
        return Ok(None);
    };

    let is_exit_request = object
        .get::<_, Value>("name")
        .ok()
        .and_then(|name| name.as_string().and_then(|s| s.to_string().ok()))
        .is_some_and(|name| name == EXIT_STATUS_NAME);
    if !is_exit_request {
        return Ok(None);
    }

    // The payload read can itself raise (throwing getters)
    let payload = object
        .get::<_, Value>("code")
        .map_err(|e| RunError::ExitCodeUnreadable(e.to_string()))?;
    Ok(Some(payload))
}

fn exit_result(payload: &Value<'_>) -> RunResult {
    if payload.is_undefined() || payload.is_null() {
        return RunResult::success();
    }

    if let Some(code) = payload.as_int() {
        return RunResult {
            outcome: TerminationOutcome::ExplicitCode(code),
            detail: None,
        };
    }
    if let Some(number) = payload.as_float() {
        if number.fract() == 0.0
            && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&number)
        {
            return RunResult {
                outcome: TerminationOutcome::ExplicitCode(number as i32),
                detail: None,
            };
        }
    }

    // Any other payload is a generic failure; string payloads are the exit
    // message and get re-surfaced verbatim.
    let detail = payload
        .as_string()
        .and_then(|s| s.to_string().ok())
        .unwrap_or_else(|| format!("{payload:?}"));
    RunResult {
        outcome: TerminationOutcome::ExplicitCode(1),
        detail: Some(detail),
    }
}

fn render_exception(exception: &Exception<'_>) -> String {
    let mut message = match exception.message() {
        Some(text) => format!("Error: {text}"),
        None => "Error: Exception (no message)".to_string(),
    };
    if let Some(stack) = exception.stack() {
        message.push('\n');
        message.push_str(&stack);
    }
    message
}
