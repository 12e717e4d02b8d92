use crate::config::RuntimeConfig;
use crate::loader::SearchPaths;
use rquickjs::function::Func;
use rquickjs::{Ctx, Object, Result};
use std::io::Write;
use std::path::PathBuf;

/// Name of the internal bootstrap namespace on `globalThis`.
pub(crate) const INTERNAL_NAME: &str = "__skiff";

/// Name of the site-directory registration hook inside the namespace.
pub(crate) const SITE_DIR_HOOK: &str = "addSiteDir";

const BOOTSTRAP_JS: &str = include_str!("bootstrap.js");

/// Installs the internal namespace, the injected process state, and the
/// app-facing `console`/`Skiff` globals.
pub(crate) fn install(
    ctx: &Ctx<'_>,
    config: &RuntimeConfig,
    search_paths: &SearchPaths,
) -> Result<()> {
    let internal = Object::new(ctx.clone())?;

    let flush = !config.buffered_stdio;
    internal.set(
        "print",
        Func::from(move |line: String| {
            println!("{line}");
            if flush {
                let _ = std::io::stdout().flush();
            }
        }),
    )?;
    internal.set(
        "printErr",
        Func::from(move |line: String| {
            eprintln!("{line}");
            if flush {
                let _ = std::io::stderr().flush();
            }
        }),
    )?;

    let paths = search_paths.clone();
    internal.set(
        SITE_DIR_HOOK,
        Func::from(move |dir: String| {
            paths.push(PathBuf::from(dir));
        }),
    )?;

    ctx.globals().set(INTERNAL_NAME, internal)?;

    inject_process_state(ctx, config).map_err(|_| rquickjs::Error::Unknown)?;

    ctx.eval::<(), _>(BOOTSTRAP_JS)?;
    Ok(())
}

// Process state crosses into the engine as JSON, so quoting is the
// serializer's problem.
fn inject_process_state(
    ctx: &Ctx<'_>,
    config: &RuntimeConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args_json = serde_json::to_string(&config.argv)?;
    ctx.eval::<(), _>(format!("globalThis.{INTERNAL_NAME}.args = {args_json};"))?;

    let exec_path = config.executable.to_string_lossy();
    let exec_json = serde_json::to_string(exec_path.as_ref())?;
    ctx.eval::<(), _>(format!(
        "globalThis.{INTERNAL_NAME}.execPath = {exec_json};"
    ))?;

    Ok(())
}
