//! Pluggable event-region compression.
//!
//! [`Strategy`] is the on-disk tag (see the trace file header); [`Compressor`]
//! is the capability trait with a `none` and a `snappy` implementation,
//! selected at runtime via [`make_compressor`].

use thiserror::Error;

/// The compression strategy recorded in a trace file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strategy {
    None = 0,
    Snappy = 1,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::None, Strategy::Snappy];

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Strategy::None),
            1 => Some(Strategy::Snappy),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Error)]
pub enum UncompressError {
    #[error("corrupt compressed input")]
    CorruptInput,
}

/// A compressor for one [`Strategy`].
///
/// Implementations may reuse an internal scratch buffer across calls, so
/// `compress`/`uncompress` take `&mut self`.
pub trait Compressor {
    fn strategy(&self) -> Strategy;
    fn compress(&mut self, uncompressed: &[u8]) -> Vec<u8>;
    fn uncompress(&mut self, compressed: &[u8]) -> Result<Vec<u8>, UncompressError>;
}

/// Identity compressor: `compress`/`uncompress` are no-ops over a copy.
#[derive(Debug, Default)]
pub struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn strategy(&self) -> Strategy {
        Strategy::None
    }

    fn compress(&mut self, uncompressed: &[u8]) -> Vec<u8> {
        uncompressed.to_vec()
    }

    fn uncompress(&mut self, compressed: &[u8]) -> Result<Vec<u8>, UncompressError> {
        Ok(compressed.to_vec())
    }
}

/// Snappy (block format) compressor, backed by the `snap` crate.
pub struct SnappyCompressor {
    encoder: snap::raw::Encoder,
    decoder: snap::raw::Decoder,
}

impl SnappyCompressor {
    pub fn new(_initial_capacity_hint: usize) -> Self {
        Self {
            encoder: snap::raw::Encoder::new(),
            decoder: snap::raw::Decoder::new(),
        }
    }
}

impl Compressor for SnappyCompressor {
    fn strategy(&self) -> Strategy {
        Strategy::Snappy
    }

    fn compress(&mut self, uncompressed: &[u8]) -> Vec<u8> {
        self.encoder
            .compress_vec(uncompressed)
            .expect("snappy compression of an in-memory buffer cannot fail")
    }

    fn uncompress(&mut self, compressed: &[u8]) -> Result<Vec<u8>, UncompressError> {
        self.decoder
            .decompress_vec(compressed)
            .map_err(|_| UncompressError::CorruptInput)
    }
}

/// Construct a [`Compressor`] for `strategy`. `initial_capacity_hint` sizes
/// the compressor's internal scratch buffer and is advisory only.
pub fn make_compressor(strategy: Strategy, initial_capacity_hint: usize) -> Box<dyn Compressor> {
    match strategy {
        Strategy::None => Box::new(NoneCompressor),
        Strategy::Snappy => Box::new(SnappyCompressor::new(initial_capacity_hint)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_round_trips() {
        let mut compressor = make_compressor(Strategy::None, 0);
        let data = b"hello spoor".to_vec();
        let compressed = compressor.compress(&data);
        let uncompressed = compressor.uncompress(&compressed).unwrap();
        assert_eq!(uncompressed, data);
    }

    #[test]
    fn snappy_round_trips() {
        let mut compressor = make_compressor(Strategy::Snappy, 64);
        let data: Vec<u8> = (0..10_000u32).flat_map(|n| n.to_le_bytes()).collect();
        let compressed = compressor.compress(&data);
        assert!(compressed.len() <= data.len());
        let uncompressed = compressor.uncompress(&compressed).unwrap();
        assert_eq!(uncompressed, data);
    }

    #[test]
    fn snappy_rejects_corrupt_input() {
        let mut compressor = make_compressor(Strategy::Snappy, 0);
        let garbage = vec![0xffu8; 16];
        assert!(matches!(
            compressor.uncompress(&garbage),
            Err(UncompressError::CorruptInput)
        ));
    }

    #[test]
    fn strategy_tag_round_trips() {
        for strategy in Strategy::ALL {
            assert_eq!(Strategy::from_tag(strategy.tag()), Some(strategy));
        }
        assert_eq!(Strategy::from_tag(2), None);
    }
}
