//! Spoor's in-process trace engine: per-thread circular buffers backed by a
//! tiered slice pool, a background flush engine that writes versioned binary
//! trace files, the three-state lifecycle, and configuration resolution.
//!
//! [`facade`] is the foreign-callable surface an instrumented binary links
//! against; the other modules are its collaborators, each independently
//! testable against the [`spoor_util::file_system`] abstraction.

pub mod config;
pub mod flush;
pub mod lifecycle;
pub mod pool;
pub mod runtime_data;
pub mod thread_buffer;

#[cfg(not(feature = "stub"))]
mod facade;
#[cfg(feature = "stub")]
mod facade_stub;

#[cfg(not(feature = "stub"))]
pub use facade::{
    clear_trace_events, deinitialize, delete_flushed_trace_files_older_than, disable, enable,
    enabled, flush_trace_events, flushed_trace_files, get_config, initialize, initialized,
    log_event, log_event_at, log_function_entry, log_function_exit, stub_implementation,
};
#[cfg(feature = "stub")]
pub use facade_stub::{
    clear_trace_events, deinitialize, delete_flushed_trace_files_older_than, disable, enable,
    enabled, flush_trace_events, flushed_trace_files, get_config, initialize, initialized,
    log_event, log_event_at, log_function_entry, log_function_exit, stub_implementation,
};

pub use config::Config;
pub use flush::DeletedFilesInfo;
