//! CRC32C Checksum Engine
//!
//! Hardware-accelerated CRC32C (Castagnoli) for send-frame integrity. The
//! checksum is defined over the logical byte stream, so it can be computed
//! segment by segment: a header range and a payload range never have to be
//! copied together first.

use serde::{Deserialize, Serialize};

/// Checksum mode negotiated for a connection
///
/// Peers that predate checksums simply never see the marker, so the mode can
/// differ per connection without renegotiating anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    /// Omit marker and checksum entirely
    None,
    /// Marker `0x0e01` followed by CRC32C
    #[default]
    Crc32c,
}

/// Calculate CRC32C over a single contiguous range
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Continue a checksum previously returned by [`compute_checksum`] or
/// [`resume_checksum`] over more bytes
pub fn resume_checksum(previous: u32, data: &[u8]) -> u32 {
    crc32c::crc32c_append(previous, data)
}

/// Calculate CRC32C over the concatenation of several ranges, in order
pub fn compute_checksum_chunks<'a, I>(chunks: I) -> u32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    chunks
        .into_iter()
        .fold(0, |crc, chunk| resume_checksum(crc, chunk))
}

/// Streaming checksum calculator for data arriving in pieces
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingChecksum {
    crc: u32,
    len: usize,
}

impl StreamingChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.crc = resume_checksum(self.crc, data);
        self.len += data.len();
    }

    /// Bytes fed so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finalize(self) -> u32 {
        self.crc
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // RFC 3720 check value for CRC32C
        assert_eq!(compute_checksum(b"123456789"), 0xE306_9283);
        assert_eq!(compute_checksum(b""), 0);
    }

    #[test]
    fn test_segmented_equals_contiguous() {
        let header = b"\x00\x00\x00\x0bmetadata...";
        let payload = vec![0xAB; 1024];

        let mut contiguous = header.to_vec();
        contiguous.extend_from_slice(&payload);

        let direct = compute_checksum(&contiguous);
        assert_eq!(resume_checksum(compute_checksum(header), &payload), direct);
        assert_eq!(compute_checksum_chunks([&header[..], &payload[..]]), direct);
    }

    #[test]
    fn test_empty_segments_are_neutral() {
        let data = b"Hello, world!";
        assert_eq!(
            compute_checksum_chunks([&b""[..], &data[..], &b""[..]]),
            compute_checksum(data)
        );
    }

    #[test]
    fn test_streaming_checksum() {
        let mut streaming = StreamingChecksum::new();
        assert!(streaming.is_empty());
        streaming.update(b"Hello, ");
        streaming.update(b"world!");
        assert_eq!(streaming.len(), 13);
        assert_eq!(streaming.finalize(), compute_checksum(b"Hello, world!"));
    }

    #[test]
    fn test_streaming_reset() {
        let mut hasher = StreamingChecksum::new();
        hasher.update(b"other data");
        hasher.reset();
        hasher.update(b"test data");
        assert_eq!(hasher.finalize(), compute_checksum(b"test data"));
    }
}
