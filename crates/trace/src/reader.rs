use std::path::Path;

use spoor_util::compression::make_compressor;
use spoor_util::file_system::FileReader;
use thiserror::Error;

use crate::event::{Event, EVENT_SIZE};
use crate::header::{Header, HeaderParseError, HEADER_SIZE, TRACE_FILE_VERSION};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open the trace file {path}")]
    FailedToOpenFile { path: String },
    #[error("trace file magic number does not match")]
    MismatchedMagicNumber,
    #[error("unsupported trace file version")]
    UnknownVersion,
    #[error("failed to uncompress the trace file's event region")]
    UncompressError,
    #[error("malformed trace file: {reason}")]
    MalformedFile { reason: String },
}

/// A fully decoded trace file: header fields plus (optionally) the event
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFile {
    pub session_id: u64,
    pub process_id: u64,
    pub thread_id: u64,
    pub system_clock_timestamp: i64,
    pub steady_clock_timestamp: i64,
    pub events: Vec<Event>,
}

/// Read and decode a `.spoor_trace` file. When `read_events` is false, the
/// event region is left unparsed and `events` is empty -- callers that only
/// need header metadata (e.g. `spoor trace dump`) can skip decompression.
pub fn read_trace_file(
    file_reader: &impl FileReader,
    path: &Path,
    read_events: bool,
) -> Result<TraceFile, ReadError> {
    let bytes = file_reader
        .read(path)
        .map_err(|_| ReadError::FailedToOpenFile { path: path.display().to_string() })?;
    if bytes.len() < HEADER_SIZE {
        return Err(ReadError::MalformedFile { reason: "file shorter than the header".to_string() });
    }

    let header = Header::from_bytes(&bytes[..HEADER_SIZE]).map_err(|e| match e {
        HeaderParseError::MismatchedMagicNumber => ReadError::MismatchedMagicNumber,
        HeaderParseError::TooShort => ReadError::MalformedFile { reason: "header truncated".to_string() },
    })?;
    if header.version != TRACE_FILE_VERSION {
        return Err(ReadError::UnknownVersion);
    }

    let mut events = Vec::new();
    if read_events {
        let compressed = &bytes[HEADER_SIZE..];
        let mut compressor = make_compressor(header.compression_strategy, compressed.len());
        let uncompressed = compressor
            .uncompress(compressed)
            .map_err(|_| ReadError::UncompressError)?;
        let expected_len = header.event_count as usize * EVENT_SIZE;
        if uncompressed.len() != expected_len {
            return Err(ReadError::MalformedFile {
                reason: format!(
                    "uncompressed event region is {} bytes, expected {expected_len}",
                    uncompressed.len()
                ),
            });
        }
        let little_endian = header.endianness.is_little();
        events.reserve(header.event_count as usize);
        for chunk in uncompressed.chunks_exact(EVENT_SIZE) {
            let array: [u8; EVENT_SIZE] = chunk.try_into().unwrap();
            events.push(Event::from_bytes(&array, little_endian));
        }
    }

    Ok(TraceFile {
        session_id: header.session_id,
        process_id: header.process_id,
        thread_id: header.thread_id,
        system_clock_timestamp: header.system_clock_timestamp,
        steady_clock_timestamp: header.steady_clock_timestamp,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Endianness;
    use crate::writer::{write_trace_file, TraceFileFields};
    use spoor_util::compression::Strategy;
    use spoor_util::file_system::MockFileSystem;

    fn fields() -> TraceFileFields {
        TraceFileFields {
            session_id: 0x11,
            process_id: 0x22,
            thread_id: 0x33,
            system_clock_timestamp: 0x44,
            steady_clock_timestamp: 0x55,
        }
    }

    #[test]
    fn round_trips_with_snappy_compression() {
        let fs = MockFileSystem::new();
        let events: Vec<Event> = (0..10_000u64)
            .map(|i| Event { steady_clock_timestamp: i as i64, payload_1: i, r#type: (i % 2) as u32, payload_2: 0 })
            .collect();
        let path = Path::new("/t.spoor_trace");
        write_trace_file(&fs, path, fields(), Strategy::Snappy, &events).unwrap();

        let body_len = fs.contents(path).unwrap().len() - HEADER_SIZE;
        assert!(body_len <= events.len() * EVENT_SIZE);

        let trace_file = read_trace_file(&fs, path, true).unwrap();
        assert_eq!(trace_file.events, events);
        assert_eq!(trace_file.session_id, 0x11);
    }

    #[test]
    fn header_only_read_skips_event_decoding() {
        let fs = MockFileSystem::new();
        let events = vec![Event { steady_clock_timestamp: 1, payload_1: 1, r#type: 0, payload_2: 0 }];
        let path = Path::new("/t.spoor_trace");
        write_trace_file(&fs, path, fields(), Strategy::None, &events).unwrap();
        let trace_file = read_trace_file(&fs, path, false).unwrap();
        assert!(trace_file.events.is_empty());
        assert_eq!(trace_file.process_id, 0x22);
    }

    #[test]
    fn rejects_unknown_version() {
        let fs = MockFileSystem::new();
        let mut header = Header {
            endianness: Endianness::native(),
            compression_strategy: Strategy::None,
            version: 9999,
            session_id: 0,
            process_id: 0,
            thread_id: 0,
            system_clock_timestamp: 0,
            steady_clock_timestamp: 0,
            event_count: 0,
        };
        let bytes = {
            let b = header.to_bytes();
            header.version = 9999;
            b
        };
        let fs = fs.with_file("/bad.spoor_trace", bytes.to_vec());
        assert!(matches!(read_trace_file(&fs, Path::new("/bad.spoor_trace"), true), Err(ReadError::UnknownVersion)));
    }

    #[test]
    fn rejects_mismatched_magic_number() {
        let fs = MockFileSystem::new().with_file("/bad.spoor_trace", vec![0u8; HEADER_SIZE]);
        assert!(matches!(
            read_trace_file(&fs, Path::new("/bad.spoor_trace"), true),
            Err(ReadError::MismatchedMagicNumber)
        ));
    }

    #[test]
    fn endianness_tolerance_cross_machine() {
        // Simulate a big-endian writer by constructing the header directly.
        let header = Header {
            endianness: Endianness::Big,
            compression_strategy: Strategy::None,
            version: TRACE_FILE_VERSION,
            session_id: 7,
            process_id: 8,
            thread_id: 9,
            system_clock_timestamp: 10,
            steady_clock_timestamp: 11,
            event_count: 1,
        };
        let event = Event { steady_clock_timestamp: 42, payload_1: 43, r#type: 0, payload_2: 44 };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&event.to_bytes(false));

        let fs = MockFileSystem::new().with_file("/be.spoor_trace", bytes);
        let trace_file = read_trace_file(&fs, Path::new("/be.spoor_trace"), true).unwrap();
        assert_eq!(trace_file.session_id, 7);
        assert_eq!(trace_file.events, vec![event]);
    }
}
