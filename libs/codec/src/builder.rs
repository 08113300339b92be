//! # Send Frame Builder
//!
//! ## Purpose
//!
//! Builds the complete outbound byte sequence for one SEND operation and
//! returns it as a [`ByteBufPair`]: a pooled header range holding every byte
//! this layer writes, paired with the caller's payload untouched.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────── header range (pooled) ───────────────────────────────┐┌ payload ┐
//! total_len | cmd_len | BaseCommand | [0x0e01 | crc32c] | meta_len | metadata | bytes…
//!                                        └── crc over ──┴──────────┴──────────┴────────┘
//! ```
//!
//! The checksum slot is written as a placeholder and patched once the
//! metadata is in place, so the header is serialized in a single pass. The
//! payload only ever contributes to the checksum by reference.
//!
//! ## Resources
//!
//! The header buffer is an RAII [`PooledBuf`](crate::pool::PooledBuf). Size
//! limits are checked before it is acquired, and once acquired it either
//! becomes the header of the returned pair or is dropped back to the pool.

use crate::checksum::{compute_checksum, resume_checksum, ChecksumType};
use crate::command::BaseCommand;
use crate::config::CodecConfig;
use crate::constants::{
    CHECKSUM_SECTION_SIZE, DEFAULT_MAX_FRAME_SIZE, LENGTH_FIELD_SIZE, MAGIC_CRC32C,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::pair::ByteBufPair;
use crate::pool::BufferPool;
use crate::wire::WireMessage;
use bytes::{BufMut, Bytes};
use tracing::trace;
use types::{MessageMetadata, SendCommand};

/// Bytes the checksum section adds for a given mode
fn checksum_section_len(checksum_type: ChecksumType) -> usize {
    match checksum_type {
        ChecksumType::Crc32c => CHECKSUM_SECTION_SIZE,
        ChecksumType::None => 0,
    }
}

/// Append `[marker | crc]? | meta_len | metadata` to `buf`
///
/// `metadata_size` must be `metadata.encoded_len()`; callers already need it
/// for sizing and pass it in rather than computing it twice.
fn write_message_section(
    buf: &mut Vec<u8>,
    checksum_type: ChecksumType,
    metadata: &MessageMetadata,
    metadata_size: usize,
    payload: &[u8],
) {
    match checksum_type {
        ChecksumType::Crc32c => {
            buf.put_u16(MAGIC_CRC32C);
            let checksum_at = buf.len();
            buf.put_u32(0);

            let covered_from = buf.len();
            buf.put_u32(metadata_size as u32);
            metadata.encode(buf);

            let checksum = resume_checksum(compute_checksum(&buf[covered_from..]), payload);
            buf[checksum_at..checksum_at + 4].copy_from_slice(&checksum.to_be_bytes());
        }
        ChecksumType::None => {
            buf.put_u32(metadata_size as u32);
            metadata.encode(buf);
        }
    }
}

/// Builds send frames, drawing header buffers from one pool
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    pool: BufferPool,
    max_frame_size: usize,
}

impl FrameEncoder {
    pub fn new(pool: BufferPool, max_frame_size: usize) -> Self {
        Self {
            pool,
            max_frame_size,
        }
    }

    /// Encoder with its own pool sized from `config`
    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(BufferPool::new(config.pool.clone()), config.max_frame_size)
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Largest size any length field can express, capped by configuration
    fn limit(&self) -> usize {
        self.max_frame_size.min(u32::MAX as usize)
    }

    /// Build a complete SEND frame
    ///
    /// Metadata is written exactly as supplied; no field is defaulted or
    /// stamped here, so identical inputs always produce identical bytes.
    pub fn new_send(
        &self,
        command: &SendCommand,
        checksum_type: ChecksumType,
        metadata: &MessageMetadata,
        payload: Bytes,
    ) -> ProtocolResult<ByteBufPair> {
        let command = BaseCommand::send(*command);
        let command_size = command.encoded_len();
        let metadata_size = metadata.encoded_len();

        // Everything after total_length except the payload
        let header_body = LENGTH_FIELD_SIZE
            + command_size
            + checksum_section_len(checksum_type)
            + LENGTH_FIELD_SIZE
            + metadata_size;
        let total_size = header_body + payload.len();
        let frame_size = LENGTH_FIELD_SIZE + total_size;

        if frame_size > self.limit() {
            return Err(ProtocolError::frame_too_large(
                frame_size,
                self.limit(),
                metadata_size,
                payload.len(),
            ));
        }

        let mut scratch = self.pool.acquire(LENGTH_FIELD_SIZE + header_body);
        let buf = scratch.as_mut_vec();
        buf.put_u32(total_size as u32);
        buf.put_u32(command_size as u32);
        command.encode(buf);
        write_message_section(buf, checksum_type, metadata, metadata_size, &payload);
        debug_assert_eq!(buf.len(), LENGTH_FIELD_SIZE + header_body);

        trace!(
            producer_id = command.send.map_or(0, |send| send.producer_id),
            checksum = ?checksum_type,
            metadata_size,
            payload_size = payload.len(),
            frame_size,
            "Built send frame"
        );

        Ok(ByteBufPair::new(scratch.freeze(), payload))
    }

    /// Build only the message section: optional checksum, metadata length,
    /// metadata, payload
    ///
    /// Used where the command envelope is not wanted, such as storing or
    /// replicating an already-accepted message.
    pub fn serialize_metadata_and_payload(
        &self,
        checksum_type: ChecksumType,
        metadata: &MessageMetadata,
        payload: Bytes,
    ) -> ProtocolResult<ByteBufPair> {
        let metadata_size = metadata.encoded_len();
        let header_size = checksum_section_len(checksum_type) + LENGTH_FIELD_SIZE + metadata_size;
        let section_size = header_size + payload.len();

        if section_size > self.limit() {
            return Err(ProtocolError::frame_too_large(
                section_size,
                self.limit(),
                metadata_size,
                payload.len(),
            ));
        }

        let mut scratch = self.pool.acquire(header_size);
        let buf = scratch.as_mut_vec();
        write_message_section(buf, checksum_type, metadata, metadata_size, &payload);
        debug_assert_eq!(buf.len(), header_size);

        Ok(ByteBufPair::new(scratch.freeze(), payload))
    }
}

impl Default for FrameEncoder {
    /// Encoder on the process-wide pool with the default frame limit
    fn default() -> Self {
        Self::new(BufferPool::global().clone(), DEFAULT_MAX_FRAME_SIZE)
    }
}

/// Build a SEND frame using the process-wide pool
pub fn new_send(
    command: &SendCommand,
    checksum_type: ChecksumType,
    metadata: &MessageMetadata,
    payload: Bytes,
) -> ProtocolResult<ByteBufPair> {
    FrameEncoder::default().new_send(command, checksum_type, metadata, payload)
}

/// Build a message section using the process-wide pool
pub fn serialize_metadata_and_payload(
    checksum_type: ChecksumType,
    metadata: &MessageMetadata,
    payload: Bytes,
) -> ProtocolResult<ByteBufPair> {
    FrameEncoder::default().serialize_metadata_and_payload(checksum_type, metadata, payload)
}
