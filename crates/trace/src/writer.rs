use std::path::Path;

use spoor_util::compression::{make_compressor, Strategy};
use spoor_util::file_system::FileWriter;
use thiserror::Error;

use crate::event::{Event, EVENT_SIZE};
use crate::header::{Endianness, Header, TRACE_FILE_VERSION};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to open the trace file {path} for writing")]
    FailedToOpenFile { path: String },
}

#[derive(Debug, Clone, Copy)]
pub struct TraceFileFields {
    pub session_id: u64,
    pub process_id: u64,
    pub thread_id: u64,
    pub system_clock_timestamp: i64,
    pub steady_clock_timestamp: i64,
}

/// Write a `.spoor_trace` file at `path`: a [`Header`] in native endianness
/// followed by `events`' region compressed with `compression_strategy`.
pub fn write_trace_file(
    file_writer: &impl FileWriter,
    path: &Path,
    fields: TraceFileFields,
    compression_strategy: Strategy,
    events: &[Event],
) -> Result<(), WriteError> {
    let little_endian = Endianness::native().is_little();
    let mut uncompressed = Vec::with_capacity(events.len() * EVENT_SIZE);
    for event in events {
        uncompressed.extend_from_slice(&event.to_bytes(little_endian));
    }

    let mut compressor = make_compressor(compression_strategy, uncompressed.len());
    let compressed = compressor.compress(&uncompressed);

    let header = Header {
        endianness: Endianness::native(),
        compression_strategy,
        version: TRACE_FILE_VERSION,
        session_id: fields.session_id,
        process_id: fields.process_id,
        thread_id: fields.thread_id,
        system_clock_timestamp: fields.system_clock_timestamp,
        steady_clock_timestamp: fields.steady_clock_timestamp,
        event_count: events.len() as u32,
    };

    let mut bytes = Vec::with_capacity(crate::header::HEADER_SIZE + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);

    file_writer
        .write(path, &bytes)
        .map_err(|_| WriteError::FailedToOpenFile { path: path.display().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_trace_file;
    use spoor_util::file_system::MockFileSystem;
    use std::path::Path;

    #[test]
    fn writes_a_file_the_reader_can_parse() {
        let fs = MockFileSystem::new();
        let events = vec![Event { steady_clock_timestamp: 1, payload_1: 2, r#type: 0, payload_2: 3 }];
        let fields = TraceFileFields {
            session_id: 1,
            process_id: 2,
            thread_id: 3,
            system_clock_timestamp: 4,
            steady_clock_timestamp: 5,
        };
        let path = Path::new("/a.spoor_trace");
        write_trace_file(&fs, path, fields, Strategy::None, &events).unwrap();
        let trace_file = read_trace_file(&fs, path, true).unwrap();
        assert_eq!(trace_file.events, events);
    }
}
