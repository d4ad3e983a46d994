use spoor_util::compression::Strategy;

/// The 8-byte ASCII tag at the start of every trace file.
pub const MAGIC_NUMBER: [u8; 8] = *b"_spoor_\0";

/// The trace file format version this crate writes and understands.
pub const TRACE_FILE_VERSION: u32 = 1;

/// Total on-disk header size, including padding to a 16-byte alignment.
pub const HEADER_SIZE: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Endianness {
    Little = 0,
    Big = 1,
}

impl Endianness {
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Endianness::Little),
            1 => Some(Endianness::Big),
            _ => None,
        }
    }

    pub fn is_little(self) -> bool {
        matches!(self, Endianness::Little)
    }
}

/// The trace file header: the fields named in the data model, laid out
/// bit-exact as described there (magic, endianness, compression strategy,
/// version, session/process/thread ids, the two clock timestamps at flush
/// time, and the event count, padded to [`HEADER_SIZE`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub endianness: Endianness,
    pub compression_strategy: Strategy,
    pub version: u32,
    pub session_id: u64,
    pub process_id: u64,
    pub thread_id: u64,
    pub system_clock_timestamp: i64,
    pub steady_clock_timestamp: i64,
    pub event_count: u32,
}

impl Header {
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let little = self.endianness.is_little();
        buf[0..8].copy_from_slice(&MAGIC_NUMBER);
        buf[8] = self.endianness as u8;
        buf[9] = self.compression_strategy.tag();
        write_u32(&mut buf[10..14], self.version, little);
        write_u64(&mut buf[14..22], self.session_id, little);
        write_u64(&mut buf[22..30], self.process_id, little);
        write_u64(&mut buf[30..38], self.thread_id, little);
        write_i64(&mut buf[38..46], self.system_clock_timestamp, little);
        write_i64(&mut buf[46..54], self.steady_clock_timestamp, little);
        write_u32(&mut buf[54..58], self.event_count, little);
        // buf[58..80] remains zeroed padding.
        buf
    }

    /// Parse a header from `bytes`, which must be at least [`HEADER_SIZE`]
    /// long. Byte-swaps all multibyte fields when the stored endianness tag
    /// differs from the reader's target endianness would suggest the bytes
    /// were written in the opposite order -- callers read using the stored
    /// tag directly, so no further swap is needed by callers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderParseError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderParseError::TooShort);
        }
        if bytes[0..8] != MAGIC_NUMBER {
            return Err(HeaderParseError::MismatchedMagicNumber);
        }
        let endianness = Endianness::from_tag(bytes[8]).ok_or(HeaderParseError::MismatchedMagicNumber)?;
        let compression_strategy =
            Strategy::from_tag(bytes[9]).ok_or(HeaderParseError::MismatchedMagicNumber)?;
        let little = endianness.is_little();
        Ok(Self {
            endianness,
            compression_strategy,
            version: read_u32(&bytes[10..14], little),
            session_id: read_u64(&bytes[14..22], little),
            process_id: read_u64(&bytes[22..30], little),
            thread_id: read_u64(&bytes[30..38], little),
            system_clock_timestamp: read_i64(&bytes[38..46], little),
            steady_clock_timestamp: read_i64(&bytes[46..54], little),
            event_count: read_u32(&bytes[54..58], little),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderParseError {
    TooShort,
    MismatchedMagicNumber,
}

fn write_u32(out: &mut [u8], value: u32, little: bool) {
    out.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
}

fn write_u64(out: &mut [u8], value: u64, little: bool) {
    out.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
}

fn write_i64(out: &mut [u8], value: i64, little: bool) {
    out.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
}

fn read_u32(bytes: &[u8], little: bool) -> u32 {
    let arr: [u8; 4] = bytes.try_into().unwrap();
    if little { u32::from_le_bytes(arr) } else { u32::from_be_bytes(arr) }
}

fn read_u64(bytes: &[u8], little: bool) -> u64 {
    let arr: [u8; 8] = bytes.try_into().unwrap();
    if little { u64::from_le_bytes(arr) } else { u64::from_be_bytes(arr) }
}

fn read_i64(bytes: &[u8], little: bool) -> i64 {
    let arr: [u8; 8] = bytes.try_into().unwrap();
    if little { i64::from_le_bytes(arr) } else { i64::from_be_bytes(arr) }
}
