//! Ties the rewriter to its file-system collaborators: loads the filter
//! rule file (or falls back to the built-in default), rewrites the module,
//! and writes the resulting symbol table. Symbol-file write errors and
//! filter-file read errors are fatal, per
//! `original_source/spoor/instrumentation/inject_instrumentation/inject_instrumentation.cc`'s
//! `run` (which calls `llvm::report_fatal_error` on either).

use std::path::{Path, PathBuf};

use spoor_filters::{default_filters, load_filters_file, Filters, LoadError};
use spoor_symbols::{write_symbols_file, WriteError};
use spoor_util::file_system::{FileReader, FileWriter};
use thiserror::Error;

use crate::demangle::GenericDemangler;
use crate::ir::Module;
use crate::rewriter::{rewrite_module, RewriteOptions};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read the filter rule file: {0}")]
    LoadFilters(#[from] LoadError),
    #[error("failed to write the symbols file: {0}")]
    WriteSymbols(#[from] WriteError),
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub filters_file_path: Option<PathBuf>,
    pub symbols_file_path: PathBuf,
    pub rewrite: RewriteOptions,
}

#[derive(Debug)]
pub struct PassOutput {
    pub modified: bool,
}

/// Run the full pass: resolve filters, rewrite `module`, and write its
/// symbol table to `options.symbols_file_path`.
pub fn run_pass<FS>(module: &mut dyn Module, file_system: &FS, options: &PassOptions) -> Result<PassOutput, Error>
where
    FS: FileReader + FileWriter,
{
    let filters = resolve_filters(file_system, options.filters_file_path.as_deref())?;
    let demangler = GenericDemangler;
    let output = rewrite_module(module, &filters, &demangler, &options.rewrite, system_clock_nanoseconds);
    write_symbols_file(file_system, &options.symbols_file_path, &output.symbols)?;
    Ok(PassOutput { modified: output.modified })
}

fn resolve_filters<FS: FileReader>(file_system: &FS, path: Option<&Path>) -> Result<Filters, LoadError> {
    match path {
        Some(path) => load_filters_file(file_system, path),
        None => Ok(Filters::new(default_filters())),
    }
}

fn system_clock_nanoseconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::mock::{MockFunction, MockModule};
    use spoor_util::file_system::MockFileSystem;

    #[test]
    fn runs_with_default_filters_when_no_filter_file_is_given() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("main", 5));
        let file_system = MockFileSystem::new();
        let options = PassOptions {
            filters_file_path: None,
            symbols_file_path: PathBuf::from("/out/symbols"),
            rewrite: RewriteOptions::default(),
        };

        let output = run_pass(&mut module, &file_system, &options).unwrap();
        assert!(output.modified);
        assert!(file_system.contents(Path::new("/out/symbols")).is_some());
    }

    #[test]
    fn a_missing_filter_file_is_a_fatal_error() {
        let mut module = MockModule::new("m");
        module.push_function(MockFunction::new("main", 5));
        let file_system = MockFileSystem::new();
        let options = PassOptions {
            filters_file_path: Some(PathBuf::from("/missing.toml")),
            symbols_file_path: PathBuf::from("/out/symbols"),
            rewrite: RewriteOptions::default(),
        };

        let error = run_pass(&mut module, &file_system, &options).unwrap_err();
        assert!(matches!(error, Error::LoadFilters(LoadError::FailedToOpenFile { .. })));
    }
}
