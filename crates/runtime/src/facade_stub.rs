//! The no-op runtime, enabled by the `stub` feature: every entry point
//! returns immediately and `stub_implementation()` reports `true`. For hosts
//! that link an instrumented binary but don't want the tracing engine
//! compiled in. Grounded on `original_source/spoor/runtime/runtime_stub.cc`.

use crate::config::Config;
use crate::flush::DeletedFilesInfo;

pub fn initialize() {}
pub fn deinitialize() {}
pub fn initialized() -> bool {
    false
}
pub fn enable() {}
pub fn disable() {}
pub fn enabled() -> bool {
    false
}
pub fn log_event(_event_type: u32, _payload_1: u64, _payload_2: u32) {}
pub fn log_event_at(_event_type: u32, _steady_clock_timestamp: i64, _payload_1: u64, _payload_2: u32) {}
pub fn log_function_entry(_function_id: u64) {}
pub fn log_function_exit(_function_id: u64) {}

pub fn flush_trace_events(callback: impl FnOnce() + Send + 'static) {
    std::thread::spawn(callback);
}

pub fn clear_trace_events() {}

pub fn flushed_trace_files(callback: impl FnOnce(Vec<std::path::PathBuf>) + Send + 'static) {
    std::thread::spawn(move || callback(Vec::new()));
}

pub fn delete_flushed_trace_files_older_than(
    _system_seconds: i64,
    callback: impl FnOnce(DeletedFilesInfo) + Send + 'static,
) {
    std::thread::spawn(move || callback(DeletedFilesInfo::default()));
}

pub fn get_config() -> Option<Config> {
    None
}

pub fn stub_implementation() -> bool {
    true
}
