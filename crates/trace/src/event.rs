/// A fixed-size, 24-byte event record: `{steady_clock_timestamp, payload_1,
/// type, payload_2}`. The layout is stable and used verbatim in the trace
/// file's event region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub steady_clock_timestamp: i64,
    pub payload_1: u64,
    pub r#type: u32,
    pub payload_2: u32,
}

pub const EVENT_SIZE: usize = 24;

/// The well-known values of [`Event::type`]. Values outside this set are
/// reserved for future user-defined events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    FunctionEntry,
    FunctionExit,
    User(u32),
}

impl EventKind {
    pub const FUNCTION_ENTRY: u32 = 0;
    pub const FUNCTION_EXIT: u32 = 1;
}

impl From<u32> for EventKind {
    fn from(value: u32) -> Self {
        match value {
            EventKind::FUNCTION_ENTRY => EventKind::FunctionEntry,
            EventKind::FUNCTION_EXIT => EventKind::FunctionExit,
            other => EventKind::User(other),
        }
    }
}

impl From<EventKind> for u32 {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::FunctionEntry => EventKind::FUNCTION_ENTRY,
            EventKind::FunctionExit => EventKind::FUNCTION_EXIT,
            EventKind::User(value) => value,
        }
    }
}

impl Event {
    pub fn to_bytes(self, little_endian: bool) -> [u8; EVENT_SIZE] {
        let mut buf = [0u8; EVENT_SIZE];
        if little_endian {
            buf[0..8].copy_from_slice(&self.steady_clock_timestamp.to_le_bytes());
            buf[8..16].copy_from_slice(&self.payload_1.to_le_bytes());
            buf[16..20].copy_from_slice(&self.r#type.to_le_bytes());
            buf[20..24].copy_from_slice(&self.payload_2.to_le_bytes());
        } else {
            buf[0..8].copy_from_slice(&self.steady_clock_timestamp.to_be_bytes());
            buf[8..16].copy_from_slice(&self.payload_1.to_be_bytes());
            buf[16..20].copy_from_slice(&self.r#type.to_be_bytes());
            buf[20..24].copy_from_slice(&self.payload_2.to_be_bytes());
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8; EVENT_SIZE], little_endian: bool) -> Self {
        let read_i64 = |s: &[u8]| {
            let arr: [u8; 8] = s.try_into().unwrap();
            if little_endian { i64::from_le_bytes(arr) } else { i64::from_be_bytes(arr) }
        };
        let read_u64 = |s: &[u8]| {
            let arr: [u8; 8] = s.try_into().unwrap();
            if little_endian { u64::from_le_bytes(arr) } else { u64::from_be_bytes(arr) }
        };
        let read_u32 = |s: &[u8]| {
            let arr: [u8; 4] = s.try_into().unwrap();
            if little_endian { u32::from_le_bytes(arr) } else { u32::from_be_bytes(arr) }
        };
        Self {
            steady_clock_timestamp: read_i64(&bytes[0..8]),
            payload_1: read_u64(&bytes[8..16]),
            r#type: read_u32(&bytes[16..20]),
            payload_2: read_u32(&bytes[20..24]),
        }
    }
}
