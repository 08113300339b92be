//! # Pub/Sub Send-Frame Codec
//!
//! ## Purpose
//!
//! The "Rules" layer for producer SEND frames: how a send command, its message
//! metadata and its payload are laid out on the wire, how the optional CRC32C
//! integrity check is written and detected, and how received frames are taken
//! apart again. The payload is carried by reference from the producer to the
//! socket and sliced out of the receive buffer on the way back in.
//!
//! ## Frame Layout
//!
//! ```text
//! total_length[4] | command_length[4] | BaseCommand | message section
//!
//! message section:
//!   [magic 0x0e01 (2) | crc32c (4)]?   only when checksums are enabled
//!   metadata_length[4]
//!   MessageMetadata
//!   payload (to end of frame)
//! ```
//!
//! All length fields are big-endian. The checksum covers
//! `metadata_length | metadata | payload`.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → transport
//!     ↑           ↓          ↓
//! Pure Data   Wire Rules   Sockets
//! Metadata    Encode/Parse FramedRead
//! ```
//!
//! ## What This Crate Contains
//! - [`FrameEncoder`] / [`new_send`]: build a frame as a [`ByteBufPair`]
//! - [`parse_message_metadata`], [`has_checksum`], [`read_checksum`],
//!   [`verify_checksum`]: cursor-level parsing of the message section
//! - [`parse_send_frame`]: whole-frame decode with optional verification
//! - [`FrameCodec`]: `tokio_util` codec that splits a stream into frames
//! - [`BufferPool`]: process-wide pool backing frame headers
//! - Protobuf-compatible encodings for `MessageMetadata` and `BaseCommand`
//!
//! ## What This Crate Does NOT Contain
//! - Connection handling, retries or redelivery (belongs to the transport)
//! - Batching, compression or encryption of payloads
//! - Any command other than SEND

pub mod builder;
pub mod checksum;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod framing;
pub mod metadata;
pub mod pair;
pub mod parser;
pub mod pool;
pub mod wire;

pub use builder::{new_send, serialize_metadata_and_payload, FrameEncoder};
pub use checksum::{
    compute_checksum, compute_checksum_chunks, resume_checksum, ChecksumType, StreamingChecksum,
};
pub use command::BaseCommand;
pub use config::{CodecConfig, PoolConfig};
pub use constants::*;
pub use error::{ProtocolError, ProtocolResult};
pub use framing::FrameCodec;
pub use pair::{ByteBufPair, FrameBuf};
pub use parser::{
    has_checksum, parse_message_metadata, parse_send_frame, read_checksum, read_checksum_field,
    skip_checksum_if_present, verify_checksum, ChecksumField, ReceivedSend,
};
pub use pool::{BufferPool, PoolError, PoolStats, PooledBuf};
pub use wire::WireMessage;

// Data types travel with the codec so callers need one import
pub use types::{CommandType, CompressionType, KeyValue, MessageMetadata, SendCommand};
