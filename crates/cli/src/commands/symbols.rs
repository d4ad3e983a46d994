use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use spoor_symbols::read_symbols_file;
use spoor_util::file_system::LocalFileSystem;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read a symbol file and print one line per (id, FunctionInfo) pair.
    Dump { path: PathBuf },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Dump { path } => dump(&path),
    }
}

fn dump(path: &Path) -> anyhow::Result<()> {
    let symbols =
        read_symbols_file(&LocalFileSystem, path).with_context(|| format!("reading symbol file {}", path.display()))?;
    for (id, infos) in symbols.iter() {
        for info in infos {
            println!(
                "{id:#018x} {} ({}) {}:{} instrumented={}",
                info.demangled_name, info.linkage_name, info.file_name, info.line, info.instrumented
            );
        }
    }
    Ok(())
}
