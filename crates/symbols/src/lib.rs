//! `FunctionId`, `FunctionInfo`, the `Symbols` map, its length-delimited file
//! format, and `reduce_symbols` for merging per-module symbol tables.

mod hash;
mod reduce;
mod symbols_file;
mod types;

pub use hash::hash32;
pub use reduce::reduce_symbols;
pub use symbols_file::{write_symbols_file, read_symbols_file, ReadError, WriteError};
pub use types::{make_function_id, module_id_hash, FunctionId, FunctionInfo, Symbols};
