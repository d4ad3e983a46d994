use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use spoor_filters::load_filters_file;
use spoor_util::file_system::LocalFileSystem;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a filter rule file and report any parse errors, without
    /// running the instrumentation pass.
    Check { path: PathBuf },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Check { path } => check(&path),
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    load_filters_file(&LocalFileSystem, path).with_context(|| format!("checking filter file {}", path.display()))?;
    println!("{}: ok", path.display());
    Ok(())
}
