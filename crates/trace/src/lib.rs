//! The wire contract shared by the trace runtime and post-hoc tools: the
//! fixed-size [`Event`] record, the versioned [`Header`] layout, and the
//! writer/reader pair that (de)serializes a `.spoor_trace` file.

mod event;
mod header;
mod reader;
mod writer;

pub use event::{Event, EventKind};
pub use header::{Header, Endianness, MAGIC_NUMBER, TRACE_FILE_VERSION, HEADER_SIZE};
pub use reader::{read_trace_file, ReadError, TraceFile};
pub use writer::{write_trace_file, TraceFileFields, WriteError};

pub type SessionId = u64;
pub type DurationNanoseconds = i64;
