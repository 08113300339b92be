//! # Codec Configuration
//!
//! Deployment-tunable parameters for framing. Everything here has a default
//! matching the wire protocol's conventions, so an empty configuration file
//! yields a working codec.

use crate::checksum::ChecksumType;
use crate::constants::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

/// Framing configuration for one connection or one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Checksum mode for outbound frames
    pub checksum: ChecksumType,

    /// Verify checksums on inbound frames that carry one
    pub verify_checksum_on_receive: bool,

    /// Ceiling on `total_length` for frames built or accepted
    pub max_frame_size: usize,

    /// Header buffer pool sizing
    pub pool: PoolConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            checksum: ChecksumType::Crc32c,
            verify_checksum_on_receive: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            pool: PoolConfig::default(),
        }
    }
}

impl CodecConfig {
    /// Checksums written and verified
    pub fn production() -> Self {
        Self::default()
    }

    /// For peers that predate the checksum feature: nothing written, nothing
    /// verified
    pub fn legacy_compatible() -> Self {
        Self {
            checksum: ChecksumType::None,
            verify_checksum_on_receive: false,
            ..Self::default()
        }
    }
}

/// Sizing of the header buffer pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Smallest size class; must be a power of two
    pub min_buffer_size: usize,

    /// Requests above this are allocated outside the pool
    pub max_pooled_buffer_size: usize,

    /// Free buffers kept per size class
    pub max_retained_per_class: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_buffer_size: 256, // Command + typical metadata
            max_pooled_buffer_size: 64 * 1024,
            max_retained_per_class: 256,
        }
    }
}
