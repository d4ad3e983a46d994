//! The `spoor` command-line tool: instrumentation-pass experimentation and
//! trace/symbol/filter file inspection, matching `spacetimedb-cli`'s
//! `main.rs` shape of a thin dispatcher over per-subcommand modules.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "spoor", version, about = "Spoor instrumentation and trace-file tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the instrumentation pass over a built-in test module.
    Instrument(commands::instrument::InstrumentArgs),
    /// Inspect a symbol file.
    Symbols {
        #[command(subcommand)]
        command: commands::symbols::Command,
    },
    /// Inspect and manage trace files.
    Trace {
        #[command(subcommand)]
        command: commands::trace::Command,
    },
    /// Validate a filter rule file.
    Filters {
        #[command(subcommand)]
        command: commands::filters::Command,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Instrument(args) => commands::instrument::run(args),
        Command::Symbols { command } => commands::symbols::run(command),
        Command::Trace { command } => commands::trace::run(command),
        Command::Filters { command } => commands::filters::run(command),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
