//! The IR rewriter pass: a module/function trait seam, a demangler
//! collaborator, the rewrite walk, and the file-backed pass that ties them
//! together and writes the resulting symbol table.

pub mod demangle;
pub mod ir;
pub mod pass;
pub mod rewriter;

/// The plugin's stable name and version, surfaced to the host toolchain.
/// Grounded on `original_source/spoor/instrumentation/instrumentation.h`.
pub const PLUGIN_NAME: &str = "inject-spoor-runtime";
pub const PLUGIN_VERSION: &str = "0.1.0";

pub use pass::{run_pass, Error, PassOptions, PassOutput};
pub use rewriter::{rewrite_module, RewriteOptions, RewriteOutput};
