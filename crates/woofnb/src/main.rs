use std::process::ExitCode;

use clap::Parser;

use woofnb::args::{Cli, Command};
use woofnb::logging::LogLevel;
use woofnb::{commands, RUNNER_VERSION};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Silent
    } else if cli.verbose > 0 {
        LogLevel::Verbose
    } else {
        LogLevel::Default
    };
    if let Err(e) = woofnb::logging::set_up_logging(level) {
        eprintln!("failed to set up logging: {e}");
        return ExitCode::from(70);
    }

    let runner_version =
        std::env::var("WOOF_RUNNER_VERSION").unwrap_or_else(|_| RUNNER_VERSION.to_string());

    let result = match cli.command {
        Command::Fmt { path, check } => commands::fmt::run(&path, &commands::fmt::Options { check }),
        Command::Lint { path, format } => commands::lint::run(&path, format),
        Command::Graph { path } => commands::graph::run(&path),
        Command::Run { path, selectors, no_deps, format } => commands::run::run(
            &path,
            &commands::run::Options { selectors, no_deps, format },
            &runner_version,
        ),
        Command::Test { path } => commands::test::run(&path, &runner_version),
        Command::Clean { path, all } => commands::clean::run(&path, all),
    };

    match result {
        Ok(status) => ExitCode::from(u8::try_from(status.code()).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::from(u8::try_from(woofnb::ExitStatus::UsageError.code()).unwrap_or(64))
        }
    }
}
