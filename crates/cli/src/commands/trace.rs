use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use spoor_runtime::flush::housekeeping;
use spoor_trace::read_trace_file;
use spoor_util::file_system::LocalFileSystem;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read a trace file and print its header fields and event count.
    Dump { path: PathBuf },
    /// List trace files under a directory.
    Enumerate {
        #[arg(long)]
        trace_file_path: PathBuf,
    },
    /// Delete every trace file under a directory, regardless of age.
    Clear {
        #[arg(long)]
        trace_file_path: PathBuf,
    },
    /// Delete trace files whose modification time precedes a threshold.
    DeleteOlderThan {
        #[arg(long)]
        trace_file_path: PathBuf,
        #[arg(long)]
        older_than_unix_seconds: i64,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Dump { path } => dump(&path),
        Command::Enumerate { trace_file_path } => enumerate(&trace_file_path),
        Command::Clear { trace_file_path } => clear(&trace_file_path),
        Command::DeleteOlderThan { trace_file_path, older_than_unix_seconds } => {
            delete_older_than(&trace_file_path, older_than_unix_seconds)
        }
    }
}

fn dump(path: &Path) -> anyhow::Result<()> {
    let trace = read_trace_file(&LocalFileSystem, path, true)
        .with_context(|| format!("reading trace file {}", path.display()))?;
    println!(
        "session_id={:#x} process_id={:#x} thread_id={:#x} system_clock_ns={} steady_clock_ns={} events={}",
        trace.session_id,
        trace.process_id,
        trace.thread_id,
        trace.system_clock_timestamp,
        trace.steady_clock_timestamp,
        trace.events.len()
    );
    Ok(())
}

fn enumerate(trace_file_path: &Path) -> anyhow::Result<()> {
    for path in housekeeping::enumerate(&LocalFileSystem, trace_file_path) {
        println!("{}", path.display());
    }
    Ok(())
}

fn clear(trace_file_path: &Path) -> anyhow::Result<()> {
    let info = housekeeping::delete_all(&LocalFileSystem, trace_file_path);
    println!("deleted {} files ({} bytes)", info.deleted_files, info.deleted_bytes);
    Ok(())
}

fn delete_older_than(trace_file_path: &Path, older_than_unix_seconds: i64) -> anyhow::Result<()> {
    let info = housekeeping::delete_older_than(&LocalFileSystem, trace_file_path, older_than_unix_seconds);
    println!("deleted {} files ({} bytes)", info.deleted_files, info.deleted_bytes);
    Ok(())
}
