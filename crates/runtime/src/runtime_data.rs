//! The process-wide runtime state created by `Initialize` and torn down by
//! `Deinitialize`: the resolved [`Config`], the slice pool, the flush engine,
//! and the registry of live per-thread buffers that admin operations
//! (`ClearTraceEvents`, `FlushTraceEvents`, a draining `Deinitialize`) use to
//! reach buffers that have not yet filled.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use spoor_util::file_system::{Directory, FileWriter};

use crate::config::Config;
use crate::flush::{FlushEngine, RetiredSlice};
use crate::pool::SlicePool;
use crate::thread_buffer::ThreadBufferShared;

pub struct RuntimeData {
    pub config: Config,
    pub pool: Arc<SlicePool>,
    pub flush_engine: FlushEngine,
    pub process_id: u64,
    registry: Mutex<Vec<Arc<ThreadBufferShared>>>,
}

impl RuntimeData {
    pub fn new<F>(config: Config, file_system: Arc<F>, process_id: u64) -> Arc<Self>
    where
        F: FileWriter + Directory + Send + Sync + 'static,
    {
        let pool = Arc::new(SlicePool::new(
            config.reserved_event_pool_capacity as usize,
            config.max_reserved_event_buffer_slice_capacity as usize,
            saturating_usize(config.dynamic_event_pool_capacity),
            config.dynamic_event_slice_borrow_cas_attempts.max(1) as usize,
            config.max_dynamic_event_buffer_slice_capacity as usize,
        ));
        let flush_engine = FlushEngine::spawn(
            file_system,
            pool.clone(),
            PathBuf::from(&config.trace_file_path),
            config.compression_strategy,
            config.max_flush_buffer_to_file_attempts,
        );
        Arc::new(Self {
            config,
            pool,
            flush_engine,
            process_id,
            registry: Mutex::new(Vec::new()),
        })
    }

    pub fn register(&self, thread: Arc<ThreadBufferShared>) {
        self.registry.lock().push(thread);
    }

    /// Discard every registered thread's in-memory events without writing
    /// them. Safe to call concurrently with in-flight appends: each thread's
    /// buffer is guarded by its own mutex, so a clear either happens before
    /// or after any given append, never mid-way through one.
    pub fn clear_all(&self) {
        for thread in self.registry.lock().iter() {
            thread.clear_all(&self.pool);
        }
        self.flush_engine.clear();
    }

    /// Retire every registered thread's held slices to the flush engine, then
    /// invoke `callback` once they have all been enqueued.
    pub fn flush_all(&self, callback: impl FnOnce() + Send + 'static) {
        let session_id = self.config.session_id;
        let process_id = self.process_id;
        for thread in self.registry.lock().iter() {
            let thread_id = thread.thread_id;
            thread.drain_all(|slice| {
                let now = now_nanoseconds();
                self.flush_engine.retire(RetiredSlice {
                    slice,
                    session_id,
                    process_id,
                    thread_id,
                    system_clock_timestamp: system_clock_nanoseconds(),
                    steady_clock_timestamp: now,
                });
            });
        }
        self.flush_engine.flush(callback);
    }

    /// Tear down: drain and write every registered thread's buffers if
    /// `drain` is true, otherwise discard them, then stop the flush worker.
    pub fn shut_down(self: Arc<Self>, drain: bool) {
        let runtime = match Arc::try_unwrap(self) {
            Ok(runtime) => runtime,
            Err(arc) => {
                // Other references are still briefly alive (e.g. an
                // in-flight log call); draining via the shared Arc is still
                // correct, it just can't move out of `flush_engine` to call
                // `stop`. Block on an explicit flush marker instead, so this
                // path still honors `flush_all_events`'s "wait for the queue
                // to drain" contract rather than returning before the
                // worker has written the retired slices.
                let session_id = arc.config.session_id;
                let process_id = arc.process_id;
                for thread in arc.registry.lock().iter() {
                    let thread_id = thread.thread_id;
                    if drain {
                        thread.drain_all(|slice| {
                            arc.flush_engine.retire(RetiredSlice {
                                slice,
                                session_id,
                                process_id,
                                thread_id,
                                system_clock_timestamp: system_clock_nanoseconds(),
                                steady_clock_timestamp: now_nanoseconds(),
                            });
                        });
                    } else {
                        thread.clear_all(&arc.pool);
                    }
                }
                if drain {
                    let (tx, rx) = std::sync::mpsc::channel();
                    arc.flush_engine.flush(move || {
                        let _ = tx.send(());
                    });
                    let _ = rx.recv();
                }
                return;
            }
        };
        let RuntimeData { config, flush_engine, registry, pool, process_id, .. } = runtime;
        let session_id = config.session_id;
        for thread in registry.lock().iter() {
            let thread_id = thread.thread_id;
            if drain {
                thread.drain_all(|slice| {
                    flush_engine.retire(RetiredSlice {
                        slice,
                        session_id,
                        process_id,
                        thread_id,
                        system_clock_timestamp: system_clock_nanoseconds(),
                        steady_clock_timestamp: now_nanoseconds(),
                    });
                });
            } else {
                thread.clear_all(&pool);
            }
        }
        flush_engine.stop(drain);
    }
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Nanoseconds on a monotonic clock, relative to an arbitrary process-local
/// epoch -- suitable only for ordering and duration math, matching the
/// steady-clock contract in the data model.
pub fn now_nanoseconds() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = *EPOCH.get_or_init(Instant::now);
    Instant::now().saturating_duration_since(epoch).as_nanos() as i64
}

/// Nanoseconds since the Unix epoch, from the system (wall) clock.
pub fn system_clock_nanoseconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
