//! Protocol-level errors for send-frame processing
//!
//! Every error here is fatal for the frame it was raised on. This layer never
//! retries; reconnect, resync and redelivery belong to the transport and the
//! application. Each variant carries enough context to explain what was
//! expected, what was found, and where.

use std::io;
use thiserror::Error;

/// Frame encoding and decoding errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A length field declares more bytes than the buffer holds
    #[error("Truncated frame: need {need} bytes, got {got} (at offset {offset}, reading {context}, action: {suggested_action})")]
    TruncatedFrame {
        need: usize,
        got: usize,
        offset: usize,
        context: String,
        suggested_action: String,
    },

    /// Transmitted checksum differs from the one computed over the received bytes
    #[error("Checksum mismatch: expected {expected:#010x}, calculated {calculated:#010x} (covered {covered_bytes} bytes, cause: {likely_cause})")]
    ChecksumMismatch {
        expected: u32,
        calculated: u32,
        covered_bytes: usize,
        likely_cause: String,
    },

    /// Serialized metadata or command bytes could not be decoded
    #[error("Malformed {message}.{field} at byte {offset}: {reason}")]
    MalformedField {
        message: &'static str,
        field: String,
        offset: usize,
        reason: String,
    },

    /// A required field was absent from a serialized message
    #[error("Missing required field {message}.{field}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// The command header is not the command this decoder handles
    #[error("Unexpected command: expected {expected}, got {got}")]
    UnexpectedCommand { expected: &'static str, got: String },

    /// Frame would exceed the configured maximum size
    #[error("Frame too large: {size} bytes exceeds maximum {max} (metadata: {metadata_size}, payload: {payload_size})")]
    FrameTooLarge {
        size: usize,
        max: usize,
        metadata_size: usize,
        payload_size: usize,
    },

    /// An outer length field disagrees with the bytes actually present
    #[error("Length mismatch in {context}: declared {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        declared: usize,
        actual: usize,
        context: &'static str,
    },

    /// Transport I/O failure surfaced through the streaming codec
    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: io::ErrorKind, message: String },
}

impl ProtocolError {
    /// Create TruncatedFrame with a hint derived from how short the buffer is
    pub fn truncated_frame(
        need: usize,
        got: usize,
        offset: usize,
        context: impl Into<String>,
    ) -> Self {
        let suggested_action = if got == 0 {
            "check message framing and socket reads"
        } else if need > got.saturating_mul(2) {
            "likely corrupted length field - resync the connection"
        } else {
            "incomplete frame delivered - reassemble before parsing"
        };

        Self::TruncatedFrame {
            need,
            got,
            offset,
            context: context.into(),
            suggested_action: suggested_action.to_string(),
        }
    }

    /// Create ChecksumMismatch with a likely cause
    pub fn checksum_mismatch(expected: u32, calculated: u32, covered_bytes: usize) -> Self {
        let likely_cause = if expected == 0 {
            "sender wrote a placeholder without computing the checksum"
        } else if covered_bytes == 0 {
            "checksum covers no bytes - frame truncated after the checksum"
        } else {
            "data corruption during transmission or storage"
        };

        Self::ChecksumMismatch {
            expected,
            calculated,
            covered_bytes,
            likely_cause: likely_cause.to_string(),
        }
    }

    pub fn malformed_field(
        message: &'static str,
        field: impl Into<String>,
        offset: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            message,
            field: field.into(),
            offset,
            reason: reason.into(),
        }
    }

    pub fn frame_too_large(
        size: usize,
        max: usize,
        metadata_size: usize,
        payload_size: usize,
    ) -> Self {
        Self::FrameTooLarge {
            size,
            max,
            metadata_size,
            payload_size,
        }
    }

    /// True for errors caused by corrupted or hostile bytes rather than
    /// local limits or I/O
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. }
                | Self::MalformedField { .. }
                | Self::MissingField { .. }
                | Self::LengthMismatch { .. }
        )
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
