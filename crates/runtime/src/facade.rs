//! The foreign-callable entry points invoked by the IR rewriter's injected
//! probes and by the host program: `Initialize`/`Deinitialize`,
//! `Enable`/`Disable`, `LogFunctionEntry`/`LogFunctionExit`, and the flush
//! housekeeping operations. Process-wide by necessity -- probe calls carry
//! no context parameter -- so state lives behind a small set of statics
//! guarded by [`Lifecycle`]'s atomic word plus a `parking_lot::RwLock` that
//! only a rare `Initialize`/`Deinitialize` ever writes.
//!
//! Grounded on `original_source/spoor/runtime/runtime.h`'s singleton-facade
//! contract and `runtime_common.cc`'s hot-path append sequence.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use spoor_trace::Event;
use spoor_util::file_system::LocalFileSystem;

use crate::config::{Config, EnvSource, FileSource, Source};
use crate::flush::DeletedFilesInfo;
use crate::lifecycle::Lifecycle;
use crate::runtime_data::{now_nanoseconds, system_clock_nanoseconds, RuntimeData};
use crate::thread_buffer::ThreadBufferShared;

static LIFECYCLE: Lifecycle = Lifecycle::new();
static RUNTIME: RwLock<Option<Arc<RuntimeData>>> = RwLock::new(None);
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
    static THREAD_BUFFER: RefCell<Option<Arc<ThreadBufferShared>>> = const { RefCell::new(None) };
}

/// `Uninitialized -> Initialized(Disabled)`. A no-op if already initialized.
/// Resolves configuration from `SPOOR_RUNTIME_*` environment variables, then
/// (if `SPOOR_RUNTIME_CONFIG_FILE_PATH` names a readable file) that file,
/// then the built-in defaults.
pub fn initialize() {
    if !LIFECYCLE.initialize() {
        return;
    }
    let default_config = Config::default_with_random_session_id();
    let mut sources: Vec<Box<dyn Source>> = vec![Box::new(EnvSource::from_env())];
    if let Some(path) = crate::config::config_file_path() {
        match FileSource::read(&LocalFileSystem, std::path::Path::new(&path)) {
            Ok(file_source) => sources.push(Box::new(file_source)),
            Err(error) => log::warn!("not using config file {path}: {error}"),
        }
    }
    let config = Config::from_sources_or_default(&sources, &default_config);
    log::debug!("spoor runtime initializing with session_id={}", config.session_id);
    let process_id = std::process::id() as u64;
    let runtime = RuntimeData::new(config, Arc::new(LocalFileSystem), process_id);
    *RUNTIME.write() = Some(runtime);
}

pub fn initialized() -> bool {
    LIFECYCLE.initialized()
}

/// `Initialized(*) -> Uninitialized`, draining per the resolved config's
/// `flush_all_events` when there is a runtime to drain. A no-op if already
/// uninitialized.
pub fn deinitialize() {
    if !LIFECYCLE.initialized() {
        return;
    }
    let runtime = RUNTIME.write().take();
    if let Some(runtime) = runtime {
        let drain = runtime.config.flush_all_events;
        log::debug!("spoor runtime deinitializing, drain={drain}");
        runtime.shut_down(drain);
    }
    LIFECYCLE.deinitialize();
}

pub fn enable() {
    LIFECYCLE.enable();
}

pub fn disable() {
    LIFECYCLE.disable();
}

pub fn enabled() -> bool {
    LIFECYCLE.enabled()
}

/// Sample the steady clock and record an event, if enabled.
pub fn log_event(event_type: u32, payload_1: u64, payload_2: u32) {
    log_event_at(event_type, now_nanoseconds(), payload_1, payload_2);
}

/// Record an event at an explicit steady-clock timestamp, if enabled.
pub fn log_event_at(event_type: u32, steady_clock_timestamp: i64, payload_1: u64, payload_2: u32) {
    if !LIFECYCLE.enabled() {
        return;
    }
    let Some(runtime) = RUNTIME.read().clone() else { return };
    let buffer = thread_buffer(&runtime);
    let event = Event { steady_clock_timestamp, payload_1, r#type: event_type, payload_2 };
    buffer.append(event, &runtime.pool, runtime.config.event_buffer_retention_duration_nanoseconds, |slice| {
        runtime.flush_engine.retire(crate::flush::RetiredSlice {
            slice,
            session_id: runtime.config.session_id,
            process_id: runtime.process_id,
            thread_id: buffer.thread_id,
            system_clock_timestamp: system_clock_nanoseconds(),
            steady_clock_timestamp: now_nanoseconds(),
        });
    });
}

pub fn log_function_entry(function_id: u64) {
    log_event(spoor_trace::EventKind::FUNCTION_ENTRY, function_id, 0);
}

pub fn log_function_exit(function_id: u64) {
    log_event(spoor_trace::EventKind::FUNCTION_EXIT, function_id, 0);
}

fn thread_buffer(runtime: &Arc<RuntimeData>) -> Arc<ThreadBufferShared> {
    THREAD_BUFFER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let thread_id = THREAD_ID.with(|id| *id);
            let shared = Arc::new(ThreadBufferShared::new(thread_id));
            runtime.register(shared.clone());
            *slot = Some(shared);
        }
        slot.as_ref().unwrap().clone()
    })
}

/// Retire every thread's held slices and invoke `callback` once they have
/// all been enqueued to the flush engine. A no-op invoking `callback`
/// immediately if the runtime is not initialized.
pub fn flush_trace_events(callback: impl FnOnce() + Send + 'static) {
    match RUNTIME.read().clone() {
        Some(runtime) => runtime.flush_all(callback),
        None => callback(),
    }
}

/// Discard every thread's in-memory events without writing them.
pub fn clear_trace_events() {
    if let Some(runtime) = RUNTIME.read().clone() {
        runtime.clear_all();
    }
}

pub fn flushed_trace_files(callback: impl FnOnce(Vec<std::path::PathBuf>) + Send + 'static) {
    match RUNTIME.read().clone() {
        Some(runtime) => runtime.flush_engine.enumerate(callback),
        None => callback(Vec::new()),
    }
}

pub fn delete_flushed_trace_files_older_than(
    system_seconds: i64,
    callback: impl FnOnce(DeletedFilesInfo) + Send + 'static,
) {
    match RUNTIME.read().clone() {
        Some(runtime) => runtime.flush_engine.delete_older_than(system_seconds, callback),
        None => callback(DeletedFilesInfo::default()),
    }
}

/// The resolved configuration, if initialized.
pub fn get_config() -> Option<Config> {
    RUNTIME.read().as_ref().map(|runtime| runtime.config.clone())
}

/// `false` for this build: the full tracing engine is compiled in. The
/// `stub` feature provides the no-op variant (see [`crate::stub`]) where
/// this reports `true`, mirroring `original_source/spoor/runtime/runtime_stub.cc`.
pub fn stub_implementation() -> bool {
    false
}
