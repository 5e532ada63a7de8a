//! Command implementations.

pub mod inspect;
pub mod lifecycle;

use crate::Context;
use anyhow::Result;
use std::time::Instant;
use terrakit::{ExecutionResult, JsonView};
use termkit::{human_duration, progress};

/// Borrow owned arguments for the workspace API
pub fn arg_refs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

/// Run one blocking terraform call behind a spinner
pub fn with_spinner<T>(
    ctx: &Context,
    msg: &str,
    done: &str,
    f: impl FnOnce() -> terrakit::Result<T>,
) -> Result<T> {
    let started = Instant::now();
    let pb = (!ctx.quiet).then(|| progress::spinner(msg));
    let result = f();
    if let Some(pb) = pb {
        match &result {
            Ok(_) => progress::finish_success(
                &pb,
                &format!("{done} ({})", human_duration(started.elapsed())),
            ),
            Err(_) => progress::finish_clear(&pb),
        }
    }
    Ok(result?)
}

/// Print captured terraform output
pub fn print_result(result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }
}

/// Print a decoded JSON result
pub fn print_json(view: &JsonView) {
    println!("{view}");
}
