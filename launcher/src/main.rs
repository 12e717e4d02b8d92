use deno_terminal::colors;
use skiff::error::process_exit_code;
use skiff::{config, error_fmt, launch, logging};
use std::env;
use std::process;

fn main() {
    let debug = env::var_os(config::DEBUG_ENV).is_some();
    logging::init(debug);

    // Arguments pass through to the app; decode lossily rather than refuse
    let argv: Vec<String> = env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    match launch::launch(argv) {
        Ok(outcome) => process::exit(process_exit_code(outcome)),
        Err(e) => {
            eprintln!(
                "{}: {}{}",
                colors::red_bold("error"),
                e,
                error_fmt::format_error_chain(&e)
            );
            process::exit(e.exit_code());
        }
    }
}
