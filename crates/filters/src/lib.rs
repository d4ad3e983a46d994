//! The filter evaluator: decides whether a function should be instrumented
//! from an ordered set of allow/block rules, and the TOML rule-file loader
//! that builds that rule set.

mod default_filters;
mod filter;
mod filters;
mod loader;

pub use default_filters::{default_filters, CONFIG_FILE_PATH_DEMANGLED_NAME};
pub use filter::{Action, Filter, FunctionInfo};
pub use filters::{EvaluateResult, Filters};
pub use loader::{load_filters_file, LoadError};
