//! # Frame Constants
//!
//! Fixed values of the send-frame wire layout. These must stay stable across
//! releases: peers built from different versions decode each other's frames
//! using nothing but these numbers.
//!
//! ```text
//! ┌──────────┬──────────┬─────────┬───────┬────────┬──────────┬──────────┬─────────┐
//! │ total(4) │ cmd(4)   │ command │ 0x0e01│ crc(4) │ meta(4)  │ metadata │ payload │
//! └──────────┴──────────┴─────────┴───────┴────────┴──────────┴──────────┴─────────┘
//!                                  └── only when checksums are on ──┘
//! ```

/// Marker preceding the checksum; its presence is the only signal that a
/// checksum follows
pub const MAGIC_CRC32C: u16 = 0x0e01;

/// Size of the checksum marker
pub const MAGIC_SIZE: usize = 2;

/// Size of the CRC32C value
pub const CHECKSUM_SIZE: usize = 4;

/// Marker plus checksum, skipped as a unit when the value is not needed
pub const CHECKSUM_SECTION_SIZE: usize = MAGIC_SIZE + CHECKSUM_SIZE;

/// Size of every u32 length prefix (total, command, metadata)
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Largest message payload a producer may publish by default
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 5 * 1024 * 1024;

/// Room for command and metadata on top of the payload limit
pub const MESSAGE_SIZE_FRAME_PADDING: usize = 10 * 1024;

/// Default ceiling on `total_length` for a single frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = DEFAULT_MAX_MESSAGE_SIZE + MESSAGE_SIZE_FRAME_PADDING;
