mod cli;
mod commands;
mod config;
mod paths;
mod session;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use session::Session;
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub session: Session,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.global.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.global.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "terrapin", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.global.verbose,
        quiet: cli.global.quiet,
        session: Session::load(&cli.global)?,
    };

    match cli.command {
        Command::Version { json } => commands::inspect::version(&ctx, json),
        Command::Init { args } => commands::lifecycle::init(&ctx, &args),
        Command::Validate { json, args } => commands::lifecycle::validate(&ctx, json, &args),
        Command::Plan { save, args } => commands::lifecycle::plan(&ctx, save, &args),
        Command::Apply { args } => commands::lifecycle::apply(&ctx, &args),
        Command::Destroy { args } => commands::lifecycle::destroy(&ctx, &args),
        Command::Output { name } => commands::inspect::output(&ctx, name.as_deref()),
        Command::State { args } => commands::inspect::state(&ctx, &args),
        Command::ShowState { resources, outputs } => {
            commands::inspect::show_state(&ctx, resources, outputs)
        }
        Command::Providers => commands::inspect::providers(&ctx),
        Command::Modules => commands::inspect::modules(&ctx),
        Command::Fmt => commands::lifecycle::fmt(&ctx),
        Command::Workspace => commands::inspect::workspace(&ctx),
        Command::Layout => commands::lifecycle::layout(&ctx),
        Command::Config => commands::inspect::config(&ctx),
        Command::Completions { .. } => Ok(()),
    }
}

/// Exit code for a failed terraform run, clamped to what a process can return.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1)
}

/// Print an error with category advice and pick the process exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    let Some(tf) = err.downcast_ref::<terrakit::Error>() else {
        termkit::error(&format!("{err:#}"));
        return ExitCode::FAILURE;
    };

    let category = tf.category();
    match tf {
        terrakit::Error::InvocationFailed {
            command,
            exit_code,
            stderr,
            ..
        } => {
            termkit::error(&format!("terraform {command} exited with {exit_code}"));
            if !stderr.is_empty() {
                eprintln!("{}", termkit::excerpt(stderr, 20));
            }
        }
        _ => termkit::error(&format!("{err:#}")),
    }
    termkit::messages::dim_err(&format!(
        "{}: {}",
        category.description(),
        category.advice()
    ));

    ExitCode::from(tf.exit_code().map_or(1, exit_status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(2), 2);
        assert_eq!(exit_status(1), 1);
        assert_eq!(exit_status(-1), 1);
        assert_eq!(exit_status(0), 1);
        assert_eq!(exit_status(300), 1);
    }
}
