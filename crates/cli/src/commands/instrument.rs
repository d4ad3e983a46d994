//! `spoor instrument` — there is no compiler frontend wired into this
//! build, so the pass runs over a small built-in module standing in for one
//! a real IR toolchain would hand it.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use spoor_instrumentation::ir::mock::{MockFunction, MockModule};
use spoor_instrumentation::pass::{run_pass, PassOptions};
use spoor_instrumentation::rewriter::RewriteOptions;
use spoor_util::file_system::LocalFileSystem;

#[derive(Debug, Args)]
pub struct InstrumentArgs {
    /// Where to write the symbol table.
    #[arg(long)]
    symbols_file_path: PathBuf,

    /// An optional filter rule file; the built-in default filters apply
    /// when omitted.
    #[arg(long)]
    filters_file_path: Option<PathBuf>,

    /// Skip injecting Initialize/Enable at `main`'s entry and Deinitialize
    /// before its returns.
    #[arg(long)]
    no_initialize_runtime: bool,

    /// Skip injecting Enable alongside Initialize (meaningless unless
    /// runtime initialization is also requested).
    #[arg(long)]
    no_enable_runtime: bool,
}

fn demo_module() -> MockModule {
    let mut module = MockModule::new("spoor-cli-demo-module");
    module.push_function(MockFunction::new("main", 12));
    module.push_function(MockFunction::new("_ZN6my_app4workEv", 40));
    module
}

pub fn run(args: InstrumentArgs) -> anyhow::Result<()> {
    let mut module = demo_module();
    let options = PassOptions {
        filters_file_path: args.filters_file_path,
        symbols_file_path: args.symbols_file_path,
        rewrite: RewriteOptions {
            initialize_runtime: !args.no_initialize_runtime,
            enable_runtime: !args.no_enable_runtime,
        },
    };

    let output =
        run_pass(&mut module, &LocalFileSystem, &options).context("running the instrumentation pass")?;
    println!("modified: {}", output.modified);
    Ok(())
}
