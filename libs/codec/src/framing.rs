//! # Stream Framing
//!
//! Splits a byte stream into complete send frames using the outer
//! `total_length` prefix, for use with `tokio_util::codec::FramedRead`.
//! Frames are yielded whole, prefix included, so they can be handed straight
//! to [`parse_send_frame`](crate::parser::parse_send_frame).
//!
//! There is no `Encoder` half: a `FramedWrite` sink would copy every payload
//! into its write buffer. Outbound frames go through
//! [`ByteBufPair::write_async`](crate::pair::ByteBufPair::write_async), which
//! hands the payload's own allocation to the transport.
//!
//! Partial reads are expected: the decoder returns `None` until the whole
//! frame has arrived and reserves room for the rest of it. A declared length
//! above the configured limit is rejected as soon as the prefix is readable,
//! before any of the body is buffered.

use crate::config::CodecConfig;
use crate::constants::{DEFAULT_MAX_FRAME_SIZE, LENGTH_FIELD_SIZE};
use crate::error::ProtocolError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

/// Length-prefixed frame codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.max_frame_size)
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Full frame size announced by the buffered prefix
    fn declared_len(src: &BytesMut) -> Option<usize> {
        let prefix: [u8; LENGTH_FIELD_SIZE] = src.get(..LENGTH_FIELD_SIZE)?.try_into().ok()?;
        Some(LENGTH_FIELD_SIZE + u32::from_be_bytes(prefix) as usize)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        let Some(frame_size) = Self::declared_len(src) else {
            return Ok(None);
        };

        if frame_size > self.max_frame_size {
            warn!(
                frame_size,
                max = self.max_frame_size,
                "Rejecting oversized frame"
            );
            return Err(ProtocolError::frame_too_large(
                frame_size,
                self.max_frame_size,
                0,
                0,
            ));
        }

        if src.len() < frame_size {
            src.reserve(frame_size - src.len());
            return Ok(None);
        }

        trace!(frame_size, "Frame complete");
        Ok(Some(src.split_to(frame_size).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(ProtocolError::truncated_frame(
                Self::declared_len(src).unwrap_or(LENGTH_FIELD_SIZE),
                src.len(),
                0,
                "frame at end of stream",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_waits_for_complete_frame() {
        let mut codec = FrameCodec::default();
        let bytes = frame(b"0123456789");

        let mut src = BytesMut::from(&bytes[..2]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(&bytes[2..9]);
        assert_eq!(codec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(&bytes[9..]);
        let decoded = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&decoded[..], &bytes[..]);
        assert!(src.is_empty());
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut codec = FrameCodec::default();
        let mut src = BytesMut::new();
        src.extend_from_slice(&frame(b"first"));
        src.extend_from_slice(&frame(b"second"));

        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[4..], b"first");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[4..], b"second");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn test_oversized_frame_rejected_from_prefix() {
        let mut codec = FrameCodec::new(64);
        let mut src = BytesMut::from(&1000u32.to_be_bytes()[..]);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { size: 1004, max: 64, .. }));
    }

    #[test]
    fn test_eof_mid_frame() {
        let mut codec = FrameCodec::default();
        let bytes = frame(b"abcdef");
        let mut src = BytesMut::from(&bytes[..7]);
        let err = codec.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, ProtocolError::TruncatedFrame { need: 10, got: 7, .. }));

        let mut empty = BytesMut::new();
        assert_eq!(codec.decode_eof(&mut empty).unwrap(), None);
    }
}
