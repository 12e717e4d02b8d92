use tracing::Level;

/// Initializes the diagnostic subscriber once, before any pipeline step.
///
/// Diagnostics go to stdout like the application's own output; the
/// separator line is what delimits the two. Step-by-step lines are
/// debug-level and appear only when the debug environment variable is
/// present.
pub fn init(debug: bool) {
    let max_level = if debug { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stdout)
        .init();
}
