use crate::config::{MODULE_PATH_ENV, RuntimeConfig};
use crate::globals::{self, INTERNAL_NAME, SITE_DIR_HOOK};
use crate::loader::{FileLoader, SearchPathResolver, SearchPaths};
use crate::outcome::{self, RunError, RunResult};
use rquickjs::runtime::RejectionTracker;
use rquickjs::{
    CatchResultExt, Context, Ctx, Function, Module, Object, Persistent, Runtime, Type, Value,
};
use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

/// Module name the entry-module driver runs under.
const MAIN_SPECIFIER: &str = "<main>";

/// Startup failures, split by phase so the embedder can report which half of
/// the bring-up broke.
#[derive(Debug, Error)]
pub enum StartError {
    /// Engine creation or loader installation failed.
    #[error("engine pre-initialization failed")]
    PreInit(#[source] rquickjs::Error),
    /// Context creation, global installation, or site imports failed.
    #[error("runtime initialization failed")]
    Init(#[source] rquickjs::Error),
}

/// Failures while registering a site directory after startup. Each step
/// fails distinctly so a broken installation pinpoints exactly what is
/// missing.
#[derive(Debug, Error)]
pub enum SiteDirError {
    /// The internal bootstrap namespace is not on the global object.
    #[error("runtime bootstrap namespace is missing")]
    RegistryMissing,
    /// The namespace has no callable site-directory hook.
    #[error("site directory hook is missing or not callable")]
    HookMissing,
    /// The directory path does not convert to UTF-8.
    #[error("site directory path is not valid UTF-8: {}", .0.display())]
    PathEncoding(PathBuf),
    /// The engine could not allocate the path string.
    #[error("could not convert the site directory path to an engine string")]
    ValueConversion(#[source] rquickjs::Error),
    /// Calling the hook raised.
    #[error("site directory registration call failed: {0}")]
    Invocation(String),
}

/// Rejections the engine reported with no handler attached, keyed by the
/// rejected promise so a later handler cancels the entry.
type UnhandledRejections =
    Rc<RefCell<Vec<(Persistent<Value<'static>>, Persistent<Value<'static>>)>>>;

/// A started engine: runtime, execution context, and the live search-path
/// list.
///
/// Started once from a [`RuntimeConfig`], used for one entry-module run,
/// and torn down by [`RuntimeHost::shutdown`] taking the host by value, so
/// a second teardown is unrepresentable.
pub struct RuntimeHost {
    // Declared first: stashed engine values must drop before the engine
    // that owns them.
    unhandled_rejections: UnhandledRejections,
    #[allow(dead_code)] // Kept alive for the context's lifetime
    runtime: Runtime,
    context: Context,
    search_paths: SearchPaths,
    config: RuntimeConfig,
}

impl RuntimeHost {
    /// Two-phase startup: engine and module loader first, then execution
    /// context, global surface, and optional site imports.
    pub fn start(config: RuntimeConfig) -> Result<Self, StartError> {
        debug!("pre-initializing engine");
        let runtime = Runtime::new().map_err(StartError::PreInit)?;
        let unhandled_rejections = UnhandledRejections::default();
        runtime.set_host_promise_rejection_tracker(Some(track_rejections(&unhandled_rejections)));

        let mut initial_dirs = config.module_search_paths.clone();
        if !config.isolated {
            if let Some(extra) = env::var_os(MODULE_PATH_ENV) {
                initial_dirs.extend(env::split_paths(&extra));
            }
        }
        let search_paths = SearchPaths::new(initial_dirs);
        runtime.set_loader(
            SearchPathResolver::new(search_paths.clone()),
            FileLoader::new(config.write_bytecode),
        );

        debug!("initializing runtime context");
        let context = Context::full(&runtime).map_err(StartError::Init)?;
        context
            .with(|ctx| globals::install(&ctx, &config, &search_paths))
            .map_err(StartError::Init)?;

        if config.site_import {
            context
                .with(|ctx| run_site_modules(&ctx, &search_paths))
                .map_err(StartError::Init)?;
        }

        Ok(Self {
            unhandled_rejections,
            runtime,
            context,
            search_paths,
            config,
        })
    }

    /// Bare specifier of the entry module this host will run.
    pub fn main_module(&self) -> &str {
        &self.config.main_module
    }

    /// The live module search directories.
    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    /// Registers an additional dependency directory with the import
    /// mechanism, through the same hook the bootstrap exposes to site
    /// scripts.
    pub fn add_site_dir(&self, dir: &Path) -> Result<(), SiteDirError> {
        debug!("adding site directory: {}", dir.display());
        self.context.with(|ctx| {
            let internal: Object = ctx
                .globals()
                .get(INTERNAL_NAME)
                .map_err(|_| SiteDirError::RegistryMissing)?;
            let hook: Function = internal
                .get(SITE_DIR_HOOK)
                .map_err(|_| SiteDirError::HookMissing)?;
            let text = dir
                .to_str()
                .ok_or_else(|| SiteDirError::PathEncoding(dir.to_path_buf()))?;
            let engine_text = rquickjs::String::from_str(ctx.clone(), text)
                .map_err(SiteDirError::ValueConversion)?;
            hook.call::<_, ()>((engine_text,))
                .map_err(|error| SiteDirError::Invocation(render_call_error(&ctx, &error)))?;
            Ok(())
        })
    }

    /// Runs the configured entry module as the program's main module,
    /// settles its module graph, then drains pending engine jobs.
    ///
    /// Never terminates the process; the embedder maps the classified
    /// result to an exit status.
    pub fn run_main(&self) -> Result<RunResult, RunError> {
        let driver = format!("import {};", js_string_literal(&self.config.main_module));
        self.context.with(|ctx| {
            let evaluated = Module::evaluate(ctx.clone(), MAIN_SPECIFIER, driver)
                .and_then(|promise| promise.finish::<()>());
            if let Err(caught) = evaluated.catch(&ctx) {
                return outcome::classify(caught);
            }
            drain_jobs(&ctx, &self.unhandled_rejections)
        })
    }

    /// Tears down the execution context and the engine.
    pub fn shutdown(self) {
        debug!("finalizing runtime");
        drop(self.unhandled_rejections);
        drop(self.context);
        drop(self.runtime);
    }
}

// The engine reports a rejection the moment it happens with no handler
// attached, and reports the same promise again if a handler shows up in a
// later job. Only entries still stashed when the queue empties are errors.
fn track_rejections(stash: &UnhandledRejections) -> RejectionTracker {
    let stash = Rc::clone(stash);
    Box::new(
        move |ctx: Ctx<'_>, promise: Value<'_>, reason: Value<'_>, is_handled: bool| {
            if is_handled {
                stash.borrow_mut().retain(|(stashed, _)| {
                    stashed
                        .clone()
                        .restore(&ctx)
                        .is_ok_and(|earlier| earlier != promise)
                });
            } else {
                stash
                    .borrow_mut()
                    .push((Persistent::save(&ctx, promise), Persistent::save(&ctx, reason)));
            }
        },
    )
}

// Execute all pending jobs (promises, microtasks), checking the error state
// after each one: a job may throw, or carry an exit request.
fn drain_jobs(ctx: &Ctx<'_>, rejections: &UnhandledRejections) -> Result<RunResult, RunError> {
    loop {
        let has_pending_job = ctx.execute_pending_job();

        let caught_value = ctx.catch();
        // An empty error state reads back as the uninitialized sentinel, not
        // as undefined; thrown undefined and null still classify.
        if caught_value.type_of() != Type::Uninitialized {
            return outcome::classify(outcome::caught_from_value(caught_value));
        }

        if !has_pending_job {
            break;
        }
    }

    // A throw inside a reaction job never reaches the catch above; it lands
    // in the job's derived promise and from there in the stash.
    let first_unhandled = rejections.borrow_mut().drain(..).next();
    match first_unhandled {
        Some((_promise, reason)) => {
            let reason = reason.restore(ctx).map_err(|_| RunError::StateUnavailable)?;
            outcome::classify(outcome::caught_from_value(reason))
        }
        None => Ok(RunResult::success()),
    }
}

// Site modules run after the global surface is installed, so they see the
// same globals applications do, plus the internal hooks.
fn run_site_modules(ctx: &Ctx<'_>, search_paths: &SearchPaths) -> rquickjs::Result<()> {
    for dir in search_paths.snapshot() {
        let site_path = dir.join("site.js");
        if !site_path.is_file() {
            continue;
        }
        let Some(name) = site_path.to_str().map(ToString::to_string) else {
            continue;
        };
        debug!("running site module \"{name}\"");
        let source = std::fs::read_to_string(&site_path)
            .map_err(|e| rquickjs::Error::new_loading_message(name.clone(), e.to_string()))?;
        Module::evaluate(ctx.clone(), name, source)?.finish::<()>()?;
    }
    Ok(())
}

fn render_call_error(ctx: &Ctx<'_>, error: &rquickjs::Error) -> String {
    if matches!(error, rquickjs::Error::Exception) {
        let caught = outcome::caught_from_value(ctx.catch());
        return outcome::render_caught(&caught);
    }
    error.to_string()
}

// Specifier quoting for the driver import. Module names are short
// path-like strings; escaped the JSON way.
fn js_string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                literal.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
