//! # Send Frame Parser
//!
//! ## Purpose
//!
//! Reads the message section of a received frame: optional checksum,
//! metadata length, metadata. Every function works on a `bytes::Buf` cursor
//! positioned by the caller, so the same code serves a `Bytes` slice of a
//! socket buffer, a plain `&[u8]`, or an `io::Cursor`.
//!
//! ## Checksum Presence
//!
//! The checksum section is optional and announced only by its two-byte
//! marker. [`has_checksum`] peeks at the marker without moving the cursor;
//! [`parse_message_metadata`] skips the section when present and never
//! validates it. Callers that want validation do it first:
//!
//! ```text
//! cursor ─┬─ has_checksum? ──yes── read_checksum / verify_checksum ──┐
//!         │                                                          ├─ parse_message_metadata ─→ payload
//!         └────────────────────────────no────────────────────────────┘
//! ```
//!
//! Both routes leave the cursor on the first payload byte.
//!
//! ## Errors
//!
//! Offsets in [`ProtocolError::TruncatedFrame`] are relative to the cursor
//! position at the start of the call. The outer length checks in
//! [`parse_send_frame`] report offsets from the start of the frame.

use crate::checksum::StreamingChecksum;
use crate::command::BaseCommand;
use crate::constants::{CHECKSUM_SECTION_SIZE, LENGTH_FIELD_SIZE, MAGIC_CRC32C, MAGIC_SIZE};
use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::WireMessage;
use bytes::{Buf, Bytes};
use serde::Serialize;
use std::io::IoSlice;
use tracing::{debug, warn};
use types::{MessageMetadata, SendCommand};

/// Checksum section as found on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum ChecksumField {
    Absent,
    Present(u32),
}

impl ChecksumField {
    pub fn is_present(&self) -> bool {
        matches!(self, ChecksumField::Present(_))
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            ChecksumField::Present(value) => Some(*value),
            ChecksumField::Absent => None,
        }
    }
}

/// First two bytes at the cursor, even if they straddle two chunks
fn peek_u16<B: Buf>(buf: &B) -> Option<u16> {
    if buf.remaining() < MAGIC_SIZE {
        return None;
    }

    let chunk = buf.chunk();
    if chunk.len() >= MAGIC_SIZE {
        return Some(u16::from_be_bytes([chunk[0], chunk[1]]));
    }

    let mut slices = [IoSlice::new(&[]); 2];
    let count = buf.chunks_vectored(&mut slices);
    let mut bytes = slices[..count].iter().flat_map(|slice| slice.iter().copied());
    Some(u16::from_be_bytes([bytes.next()?, bytes.next()?]))
}

/// True when the checksum marker sits at the cursor; never advances
pub fn has_checksum<B: Buf>(buf: &B) -> bool {
    peek_u16(buf) == Some(MAGIC_CRC32C)
}

/// Consume the marker and return the checksum that follows it
///
/// # Panics
///
/// Panics when no marker is present. Gate every call with [`has_checksum`].
pub fn read_checksum<B: Buf>(buf: &mut B) -> ProtocolResult<u32> {
    assert!(
        has_checksum(buf),
        "read_checksum called without a checksum marker at the cursor"
    );

    if buf.remaining() < CHECKSUM_SECTION_SIZE {
        return Err(ProtocolError::truncated_frame(
            CHECKSUM_SECTION_SIZE,
            buf.remaining(),
            0,
            "checksum",
        ));
    }

    buf.advance(MAGIC_SIZE);
    Ok(buf.get_u32())
}

/// Read the checksum section if there is one
pub fn read_checksum_field<B: Buf>(buf: &mut B) -> ProtocolResult<ChecksumField> {
    if has_checksum(buf) {
        read_checksum(buf).map(ChecksumField::Present)
    } else {
        Ok(ChecksumField::Absent)
    }
}

/// Step over the checksum section, discarding its value; true if one was
/// present
pub fn skip_checksum_if_present<B: Buf>(buf: &mut B) -> ProtocolResult<bool> {
    Ok(read_checksum_field(buf)?.is_present())
}

/// Read the checksum section and check it against the rest of the message
/// section
///
/// The cursor ends just after the checksum section, ready for
/// [`parse_message_metadata`]. A frame without a checksum passes as
/// [`ChecksumField::Absent`].
pub fn verify_checksum<B: Buf + Clone>(buf: &mut B) -> ProtocolResult<ChecksumField> {
    let field = read_checksum_field(buf)?;
    let ChecksumField::Present(expected) = field else {
        return Ok(field);
    };

    let mut covered = buf.clone();
    let mut calculated = StreamingChecksum::new();
    while covered.has_remaining() {
        let chunk = covered.chunk();
        let len = chunk.len();
        calculated.update(chunk);
        covered.advance(len);
    }

    let covered_bytes = calculated.len();
    let calculated = calculated.finalize();
    if calculated != expected {
        warn!(
            expected = format_args!("{:#010x}", expected),
            calculated = format_args!("{:#010x}", calculated),
            covered_bytes,
            "Checksum mismatch on received frame"
        );
        return Err(ProtocolError::checksum_mismatch(
            expected,
            calculated,
            covered_bytes,
        ));
    }

    Ok(field)
}

/// Decode the message metadata, leaving the cursor at the first payload byte
///
/// A checksum section at the cursor is skipped without validation.
pub fn parse_message_metadata<B: Buf>(buf: &mut B) -> ProtocolResult<MessageMetadata> {
    let mut consumed = 0;
    if skip_checksum_if_present(buf)? {
        consumed += CHECKSUM_SECTION_SIZE;
    }

    if buf.remaining() < LENGTH_FIELD_SIZE {
        return Err(ProtocolError::truncated_frame(
            LENGTH_FIELD_SIZE,
            buf.remaining(),
            consumed,
            "metadata length",
        ));
    }
    let metadata_size = buf.get_u32() as usize;
    consumed += LENGTH_FIELD_SIZE;

    if buf.remaining() < metadata_size {
        return Err(ProtocolError::truncated_frame(
            metadata_size,
            buf.remaining(),
            consumed,
            "metadata",
        ));
    }

    if buf.chunk().len() >= metadata_size {
        let metadata = MessageMetadata::decode(&buf.chunk()[..metadata_size])?;
        buf.advance(metadata_size);
        Ok(metadata)
    } else {
        // Metadata straddles chunks
        MessageMetadata::decode(&buf.copy_to_bytes(metadata_size))
    }
}

/// A SEND frame decoded in full
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSend {
    pub command: SendCommand,
    pub checksum: ChecksumField,
    pub metadata: MessageMetadata,
    /// Slice of the received frame; no copy
    pub payload: Bytes,
}

/// Decode one complete frame, starting at its `total_length` field
///
/// With `verify` set, a present checksum must match or the frame is
/// rejected with [`ProtocolError::ChecksumMismatch`].
pub fn parse_send_frame(frame: Bytes, verify: bool) -> ProtocolResult<ReceivedSend> {
    let mut cursor = frame;

    if cursor.remaining() < LENGTH_FIELD_SIZE {
        return Err(ProtocolError::truncated_frame(
            LENGTH_FIELD_SIZE,
            cursor.remaining(),
            0,
            "total length",
        ));
    }
    let total_size = cursor.get_u32() as usize;
    if total_size > cursor.remaining() {
        return Err(ProtocolError::truncated_frame(
            total_size,
            cursor.remaining(),
            LENGTH_FIELD_SIZE,
            "frame body",
        ));
    }
    if total_size < cursor.remaining() {
        return Err(ProtocolError::LengthMismatch {
            declared: total_size,
            actual: cursor.remaining(),
            context: "total_length",
        });
    }

    if cursor.remaining() < LENGTH_FIELD_SIZE {
        return Err(ProtocolError::truncated_frame(
            LENGTH_FIELD_SIZE,
            cursor.remaining(),
            LENGTH_FIELD_SIZE,
            "command length",
        ));
    }
    let command_size = cursor.get_u32() as usize;
    if command_size > cursor.remaining() {
        return Err(ProtocolError::truncated_frame(
            command_size,
            cursor.remaining(),
            2 * LENGTH_FIELD_SIZE,
            "command",
        ));
    }
    let command_bytes = cursor.split_to(command_size);
    let command = BaseCommand::decode(&command_bytes)?.into_send()?;

    let section_size = cursor.len();
    let checksum = if verify {
        verify_checksum(&mut cursor)?
    } else {
        read_checksum_field(&mut cursor)?
    };
    let metadata = parse_message_metadata(&mut cursor)?;

    debug!(
        producer_id = command.producer_id,
        sequence_id = command.sequence_id,
        checksum = checksum.is_present(),
        verified = verify && checksum.is_present(),
        section_size,
        payload_size = cursor.len(),
        "Parsed send frame"
    );

    Ok(ReceivedSend {
        command,
        checksum,
        metadata,
        payload: cursor,
    })
}
