// Copyright 2018-2025 the Deno authors. MIT license.

use std::error::Error;
use std::fmt::Write;

/// Formats an error's source chain with numbered lines.
///
/// The head error itself is not repeated: the caller prints it as the
/// message, and the chain lists its causes starting from 0. Consecutive
/// duplicate messages are skipped, and depth is capped to keep cyclic
/// chains finite.
pub fn format_error_chain(error: &dyn Error) -> String {
    let mut message = String::new();
    let mut display_count = 0;
    let mut past_message = error.to_string();

    let mut maybe_source = error.source();
    while let Some(source) = maybe_source {
        let current_message = source.to_string();
        maybe_source = source.source();

        if current_message != past_message {
            let _ = write!(&mut message, "\n    {display_count}: {current_message}");
            past_message = current_message;
            display_count += 1;
        }

        if display_count >= 8 {
            message.push_str("\n    ...");
            break;
        }
    }

    message
}
