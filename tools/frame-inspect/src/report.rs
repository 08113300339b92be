//! Frame decoding and reporting

use anyhow::{Context, Result};
use bytes::BytesMut;
use codec::{parse_send_frame, ChecksumField, CompressionType, FrameCodec, MessageMetadata};
use serde::Serialize;
use std::fmt;
use tokio_util::codec::Decoder;
use tracing::debug;

const PREVIEW_BYTES: usize = 16;

/// Everything reported about one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub frame_size: usize,
    pub producer_id: u64,
    pub sequence_id: u64,
    pub num_messages: Option<i32>,
    pub checksum: ChecksumField,
    pub checksum_verified: bool,
    pub metadata: MessageMetadata,
    pub payload_size: usize,
    /// Hex of the first payload bytes
    pub payload_preview: String,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frame #{}: {} bytes", self.index, self.frame_size)?;
        write!(
            f,
            "  command:  SEND producer_id={} sequence_id={}",
            self.producer_id, self.sequence_id
        )?;
        if let Some(count) = self.num_messages {
            write!(f, " num_messages={}", count)?;
        }
        writeln!(f)?;

        match self.checksum {
            ChecksumField::Present(value) if self.checksum_verified => {
                writeln!(f, "  checksum: {:#010x} (verified)", value)?
            }
            ChecksumField::Present(value) => writeln!(f, "  checksum: {:#010x} (not verified)", value)?,
            ChecksumField::Absent => writeln!(f, "  checksum: absent")?,
        }

        let meta = &self.metadata;
        write!(
            f,
            "  metadata: producer_name={:?} sequence_id={} publish_time={}",
            meta.producer_name, meta.sequence_id, meta.publish_time
        )?;
        if let Some(key) = &meta.partition_key {
            write!(f, " partition_key={:?}", key)?;
        }
        if let Some(event_time) = meta.event_time {
            write!(f, " event_time={}", event_time)?;
        }
        if meta.compression != CompressionType::None {
            write!(f, " compression={:?}", meta.compression)?;
        }
        writeln!(f)?;
        for property in &meta.properties {
            writeln!(f, "    {} = {}", property.key, property.value)?;
        }

        write!(f, "  payload:  {} bytes", self.payload_size)?;
        if !self.payload_preview.is_empty() {
            write!(f, " [{}", self.payload_preview)?;
            if self.payload_size > PREVIEW_BYTES {
                write!(f, "...")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Turn file contents into raw frame bytes
///
/// Hex input may contain whitespace and line breaks anywhere.
pub fn decode_input(raw: Vec<u8>, hex_input: bool) -> Result<BytesMut> {
    if !hex_input {
        return Ok(BytesMut::from(&raw[..]));
    }

    let digits: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
    let bytes = hex::decode(&digits).context("Input is not valid hex")?;
    Ok(BytesMut::from(&bytes[..]))
}

/// Walks concatenated frames in a buffer
pub struct Inspector {
    codec: FrameCodec,
    buf: BytesMut,
    verify: bool,
    index: usize,
}

impl Inspector {
    pub fn new(buf: BytesMut, codec: FrameCodec, verify: bool) -> Self {
        Self {
            codec,
            buf,
            verify,
            index: 0,
        }
    }

    /// Decode the next frame; `None` once the input is exhausted
    pub fn next_report(&mut self) -> Result<Option<FrameReport>> {
        let index = self.index;
        let Some(frame) = self
            .codec
            .decode_eof(&mut self.buf)
            .with_context(|| format!("Failed to split frame #{}", index))?
        else {
            return Ok(None);
        };
        self.index += 1;

        let frame_size = frame.len();
        let send = parse_send_frame(frame, self.verify)
            .with_context(|| format!("Failed to decode frame #{}", index))?;
        debug!(index, frame_size, "Decoded frame");

        let preview_len = send.payload.len().min(PREVIEW_BYTES);
        Ok(Some(FrameReport {
            index,
            frame_size,
            producer_id: send.command.producer_id,
            sequence_id: send.command.sequence_id,
            num_messages: send.command.num_messages,
            checksum: send.checksum,
            checksum_verified: self.verify && send.checksum.is_present(),
            metadata: send.metadata,
            payload_size: send.payload.len(),
            payload_preview: hex::encode(&send.payload[..preview_len]),
        }))
    }
}
