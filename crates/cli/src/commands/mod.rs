pub mod filters;
pub mod instrument;
pub mod symbols;
pub mod trace;
