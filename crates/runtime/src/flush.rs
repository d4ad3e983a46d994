//! The background flush worker: a single consumer draining retired slices
//! from a lock-free multi-producer queue, compressing and writing each to a
//! versioned trace file, and servicing the auxiliary flush/clear/enumerate
//! operations. Grounded on `original_source/spoor/runtime/runtime_common.cc`'s
//! drain loop and `trace_file_writer.cc`'s retry policy.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use regex::Regex;
use spoor_trace::{write_trace_file, TraceFileFields};
use spoor_util::compression::Strategy;
use spoor_util::file_system::{Directory, FileWriter};

use crate::pool::{BorrowedSlice, SlicePool};

/// A slice retired by a per-thread buffer, on its way to disk.
pub struct RetiredSlice {
    pub slice: BorrowedSlice,
    pub session_id: u64,
    pub process_id: u64,
    pub thread_id: u64,
    pub system_clock_timestamp: i64,
    pub steady_clock_timestamp: i64,
}

/// Deletion accounting returned by `DeleteFlushedTraceFilesOlderThan`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletedFilesInfo {
    pub deleted_files: i32,
    pub deleted_bytes: i64,
}

enum Message {
    Retired(RetiredSlice),
    Flush(Box<dyn FnOnce() + Send>),
    Clear,
    Enumerate(Box<dyn FnOnce(Vec<PathBuf>) + Send>),
    DeleteOlderThan { system_seconds: i64, callback: Box<dyn FnOnce(DeletedFilesInfo) + Send> },
    Stop { drain: bool },
}

/// A handle to the background worker: `sender` is cloned into every thread
/// that retires a slice, `handle` is joined by `Deinitialize`.
pub struct FlushEngine {
    sender: crossbeam_channel::Sender<Message>,
    handle: Option<JoinHandle<()>>,
    dropped_slices: Arc<AtomicU64>,
}

pub fn trace_file_name_pattern() -> Regex {
    Regex::new(r"^(?:\d+)-(?:\d+)-(?:\d+)-(?:\d+)\.spoor_trace$").expect("static pattern compiles")
}

/// Standalone directory housekeeping, usable without a live runtime (e.g. by
/// `spoor-cli`, which inspects a trace directory left behind by a process it
/// did not start).
pub mod housekeeping {
    use std::path::{Path, PathBuf};

    use spoor_util::file_system::Directory;

    use super::DeletedFilesInfo;

    pub fn enumerate<D: Directory>(directory: &D, trace_file_path: &Path) -> Vec<PathBuf> {
        super::list_trace_files(directory, trace_file_path, &super::trace_file_name_pattern())
    }

    pub fn delete_older_than<D: Directory>(
        directory: &D,
        trace_file_path: &Path,
        system_seconds: i64,
    ) -> DeletedFilesInfo {
        super::delete_older_than(directory, trace_file_path, &super::trace_file_name_pattern(), system_seconds)
    }

    /// Delete every matching trace file regardless of age -- the CLI's
    /// `trace clear` housekeeping counterpart to the runtime's in-memory
    /// `ClearTraceEvents` (which has no meaning against a directory no
    /// live process is writing to).
    pub fn delete_all<D: Directory>(directory: &D, trace_file_path: &Path) -> DeletedFilesInfo {
        delete_older_than(directory, trace_file_path, i64::MAX)
    }
}

impl FlushEngine {
    pub fn spawn<F>(
        file_system: Arc<F>,
        pool: Arc<SlicePool>,
        trace_file_path: PathBuf,
        compression_strategy: Strategy,
        max_flush_buffer_to_file_attempts: i32,
    ) -> Self
    where
        F: FileWriter + Directory + Send + Sync + 'static,
    {
        let (sender, receiver) = crossbeam_channel::unbounded::<Message>();
        let dropped_slices = Arc::new(AtomicU64::new(0));
        let worker_dropped_slices = dropped_slices.clone();
        let handle = std::thread::Builder::new()
            .name("spoor-flush".to_string())
            .spawn(move || {
                run(
                    receiver,
                    file_system,
                    pool,
                    trace_file_path,
                    compression_strategy,
                    max_flush_buffer_to_file_attempts,
                    &worker_dropped_slices,
                )
            })
            .expect("spawning the flush worker thread");
        Self { sender, handle: Some(handle), dropped_slices }
    }

    /// The number of retired slices dropped after exhausting
    /// `max_flush_buffer_to_file_attempts` write attempts.
    pub fn dropped_slices(&self) -> u64 {
        self.dropped_slices.load(Ordering::Relaxed)
    }

    pub fn retire(&self, slice: RetiredSlice) {
        let _ = self.sender.send(Message::Retired(slice));
    }

    pub fn flush(&self, callback: impl FnOnce() + Send + 'static) {
        let _ = self.sender.send(Message::Flush(Box::new(callback)));
    }

    pub fn clear(&self) {
        let _ = self.sender.send(Message::Clear);
    }

    pub fn enumerate(&self, callback: impl FnOnce(Vec<PathBuf>) + Send + 'static) {
        let _ = self.sender.send(Message::Enumerate(Box::new(callback)));
    }

    pub fn delete_older_than(
        &self,
        system_seconds: i64,
        callback: impl FnOnce(DeletedFilesInfo) + Send + 'static,
    ) {
        let _ = self.sender.send(Message::DeleteOlderThan {
            system_seconds,
            callback: Box::new(callback),
        });
    }

    /// Signal the worker to stop. When `drain` is true, queued retired
    /// slices are written before the worker exits; otherwise they are
    /// discarded (and counted as dropped).
    pub fn stop(mut self, drain: bool) {
        let _ = self.sender.send(Message::Stop { drain });
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run<F>(
    receiver: crossbeam_channel::Receiver<Message>,
    file_system: Arc<F>,
    pool: Arc<SlicePool>,
    trace_file_path: PathBuf,
    compression_strategy: Strategy,
    max_flush_buffer_to_file_attempts: i32,
    dropped_slices: &AtomicU64,
) where
    F: FileWriter + Directory + Send + Sync + 'static,
{
    let pattern = trace_file_name_pattern();
    for message in receiver.iter() {
        match message {
            Message::Retired(retired) => {
                write_retired_slice(
                    file_system.as_ref(),
                    &trace_file_path,
                    compression_strategy,
                    max_flush_buffer_to_file_attempts,
                    &retired,
                    dropped_slices,
                );
                pool.return_slice(retired.slice);
            }
            Message::Flush(callback) => callback(),
            Message::Clear => drain_without_writing(&receiver, &pool),
            Message::Enumerate(callback) => {
                let files = list_trace_files(file_system.as_ref(), &trace_file_path, &pattern);
                callback(files);
            }
            Message::DeleteOlderThan { system_seconds, callback } => {
                let info = delete_older_than(file_system.as_ref(), &trace_file_path, &pattern, system_seconds);
                callback(info);
            }
            Message::Stop { drain } => {
                if drain {
                    while let Ok(message) = receiver.try_recv() {
                        if let Message::Retired(retired) = message {
                            write_retired_slice(
                                file_system.as_ref(),
                                &trace_file_path,
                                compression_strategy,
                                max_flush_buffer_to_file_attempts,
                                &retired,
                                dropped_slices,
                            );
                            pool.return_slice(retired.slice);
                        }
                    }
                } else {
                    drain_without_writing(&receiver, &pool);
                }
                return;
            }
        }
    }
}

fn drain_without_writing(receiver: &crossbeam_channel::Receiver<Message>, pool: &SlicePool) {
    while let Ok(message) = receiver.try_recv() {
        if let Message::Retired(retired) = message {
            pool.return_slice(retired.slice);
        }
    }
}

fn write_retired_slice<F: FileWriter>(
    file_system: &F,
    trace_file_path: &std::path::Path,
    compression_strategy: Strategy,
    max_attempts: i32,
    retired: &RetiredSlice,
    dropped_slices: &AtomicU64,
) {
    let file_name = format!(
        "{}-{}-{}-{}.spoor_trace",
        retired.session_id, retired.process_id, retired.thread_id, retired.steady_clock_timestamp
    );
    let path = trace_file_path.join(file_name);
    let fields = TraceFileFields {
        session_id: retired.session_id,
        process_id: retired.process_id,
        thread_id: retired.thread_id,
        system_clock_timestamp: retired.system_clock_timestamp,
        steady_clock_timestamp: retired.steady_clock_timestamp,
    };
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match write_trace_file(file_system, &path, fields, compression_strategy, retired.slice.slice().events()) {
            Ok(()) => return,
            Err(_) if attempt < attempts => continue,
            Err(_) => {
                dropped_slices.fetch_add(1, Ordering::Relaxed);
                log::warn!("dropping a trace slice after {attempts} failed flush attempts");
            }
        }
    }
}

fn list_trace_files<D: Directory>(directory: &D, trace_file_path: &std::path::Path, pattern: &Regex) -> Vec<PathBuf> {
    directory
        .list(trace_file_path)
        .unwrap_or_default()
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| pattern.is_match(n))
        })
        .collect()
}

fn delete_older_than<D: Directory>(
    directory: &D,
    trace_file_path: &std::path::Path,
    pattern: &Regex,
    system_seconds: i64,
) -> DeletedFilesInfo {
    let mut info = DeletedFilesInfo::default();
    for path in list_trace_files(directory, trace_file_path, pattern) {
        let Ok(modified) = directory.modified_unix_seconds(&path) else { continue };
        if modified >= system_seconds {
            continue;
        }
        let Ok(size) = directory.size(&path) else { continue };
        if directory.remove(&path).is_ok() {
            info.deleted_files += 1;
            info.deleted_bytes += size as i64;
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SlicePool;
    use spoor_util::file_system::MockFileSystem;
    use spoor_trace::Event;
    use std::sync::mpsc;

    fn sample_pool() -> Arc<SlicePool> {
        Arc::new(SlicePool::new(4, 16, 4, 4, 16))
    }

    #[test]
    fn retired_slice_is_written_and_returned_to_pool() {
        let fs = Arc::new(MockFileSystem::new());
        let pool = sample_pool();
        let engine = FlushEngine::spawn(fs.clone(), pool.clone(), PathBuf::from("/traces"), Strategy::None, 2);

        let mut slice = pool.try_borrow(false).unwrap();
        slice.slice_mut().push(Event { steady_clock_timestamp: 1, payload_1: 0, r#type: 0, payload_2: 0 });
        engine.retire(RetiredSlice {
            slice,
            session_id: 1,
            process_id: 2,
            thread_id: 3,
            system_clock_timestamp: 4,
            steady_clock_timestamp: 5,
        });

        let (tx, rx) = mpsc::channel();
        engine.flush(move || tx.send(()).unwrap());
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();

        assert!(fs.contents(std::path::Path::new("/traces/1-2-3-5.spoor_trace")).is_some());
        engine.stop(true);
    }

    #[test]
    fn clear_discards_queued_slices_without_writing() {
        let fs = Arc::new(MockFileSystem::new());
        let pool = sample_pool();
        let engine = FlushEngine::spawn(fs.clone(), pool.clone(), PathBuf::from("/traces"), Strategy::None, 2);

        let slice = pool.try_borrow(false).unwrap();
        engine.retire(RetiredSlice {
            slice,
            session_id: 9,
            process_id: 9,
            thread_id: 9,
            system_clock_timestamp: 9,
            steady_clock_timestamp: 9,
        });
        engine.clear();

        let (tx, rx) = mpsc::channel();
        engine.flush(move || tx.send(()).unwrap());
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();

        assert!(fs.contents(std::path::Path::new("/traces/9-9-9-9.spoor_trace")).is_none());
        engine.stop(true);
    }

    #[test]
    fn enumerate_lists_only_matching_trace_files() {
        let fs = Arc::new(
            MockFileSystem::new()
                .with_file("/traces/1-2-3-4.spoor_trace", "x")
                .with_file("/traces/notes.txt", "y"),
        );
        let pool = sample_pool();
        let engine = FlushEngine::spawn(fs, pool, PathBuf::from("/traces"), Strategy::None, 2);

        let (tx, rx) = mpsc::channel();
        engine.enumerate(move |files| tx.send(files).unwrap());
        let files = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(files.len(), 1);
        engine.stop(false);
    }

    #[test]
    fn delete_older_than_removes_only_stale_matching_files() {
        let fs = Arc::new(
            MockFileSystem::new()
                .with_file_modified_at("/traces/1-1-1-1.spoor_trace", "old", 10)
                .with_file_modified_at("/traces/2-2-2-2.spoor_trace", "new", 1000),
        );
        let pool = sample_pool();
        let engine = FlushEngine::spawn(fs.clone(), pool, PathBuf::from("/traces"), Strategy::None, 2);

        let (tx, rx) = mpsc::channel();
        engine.delete_older_than(500, move |info| tx.send(info).unwrap());
        let info = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(info.deleted_files, 1);
        assert_eq!(info.deleted_bytes, 3);
        assert!(fs.contents(std::path::Path::new("/traces/2-2-2-2.spoor_trace")).is_some());
        engine.stop(false);
    }

    struct AlwaysFailsWrite(MockFileSystem);

    impl FileWriter for AlwaysFailsWrite {
        fn write(&self, _path: &std::path::Path, _data: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
    }

    impl Directory for AlwaysFailsWrite {
        fn list(&self, directory: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
            self.0.list(directory)
        }
        fn modified_unix_seconds(&self, path: &std::path::Path) -> std::io::Result<i64> {
            self.0.modified_unix_seconds(path)
        }
        fn remove(&self, path: &std::path::Path) -> std::io::Result<()> {
            self.0.remove(path)
        }
        fn size(&self, path: &std::path::Path) -> std::io::Result<u64> {
            self.0.size(path)
        }
    }

    #[test]
    fn exhausting_flush_attempts_drops_and_counts_the_slice() {
        let fs = Arc::new(AlwaysFailsWrite(MockFileSystem::new()));
        let pool = sample_pool();
        let engine = FlushEngine::spawn(fs, pool.clone(), PathBuf::from("/traces"), Strategy::None, 2);

        let mut slice = pool.try_borrow(false).unwrap();
        slice.slice_mut().push(Event { steady_clock_timestamp: 1, payload_1: 0, r#type: 0, payload_2: 0 });
        engine.retire(RetiredSlice {
            slice,
            session_id: 1,
            process_id: 2,
            thread_id: 3,
            system_clock_timestamp: 4,
            steady_clock_timestamp: 5,
        });

        let (tx, rx) = mpsc::channel();
        engine.flush(move || tx.send(()).unwrap());
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();

        assert_eq!(engine.dropped_slices(), 1);
        engine.stop(true);
    }

    #[test]
    fn housekeeping_enumerate_and_delete_all_work_without_a_live_engine() {
        use spoor_util::file_system::MockFileSystem;

        let fs = MockFileSystem::new()
            .with_file("/traces/1-2-3-4.spoor_trace", "x")
            .with_file("/traces/5-6-7-8.spoor_trace", "yy")
            .with_file("/traces/notes.txt", "z");

        let files = housekeeping::enumerate(&fs, PathBuf::from("/traces").as_path());
        assert_eq!(files.len(), 2);

        let info = housekeeping::delete_all(&fs, PathBuf::from("/traces").as_path());
        assert_eq!(info.deleted_files, 2);
        assert_eq!(info.deleted_bytes, 3);
        assert!(housekeeping::enumerate(&fs, PathBuf::from("/traces").as_path()).is_empty());
    }
}
