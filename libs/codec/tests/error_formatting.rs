//! Error formatting tests
//!
//! Errors surfaced from real frames must say what was expected, what was
//! found and where, in both Debug (logging) and Display (operators) output.

use bytes::Bytes;
use codec::error::ProtocolError;
use codec::{parse_message_metadata, parse_send_frame};

#[test]
fn test_truncated_metadata_formatting() {
    // meta_len = 64, three bytes follow
    let mut cursor = &[0u8, 0, 0, 64, 0x0a, 0x01, b'p'][..];
    let error = parse_message_metadata(&mut cursor).unwrap_err();

    let debug_output = format!("{:?}", error);
    assert!(debug_output.contains("TruncatedFrame"));
    assert!(debug_output.contains("64"));

    let display_output = format!("{}", error);
    assert!(display_output.contains("Truncated frame"));
    assert!(display_output.contains("need 64 bytes, got 3"));
    assert!(display_output.contains("at offset 4"));
    assert!(display_output.contains("reading metadata"));
    assert!(display_output.contains("corrupted length field"));
}

#[test]
fn test_malformed_metadata_formatting() {
    // meta_len = 2, then field 1 (producer_name) declaring 9 bytes
    let mut cursor = &[0u8, 0, 0, 2, 0x0a, 0x09][..];
    let error = parse_message_metadata(&mut cursor).unwrap_err();

    let display_output = format!("{}", error);
    assert!(display_output.contains("Malformed MessageMetadata.producer_name"));
    assert!(error.is_integrity_fault());
}

#[test]
fn test_checksum_mismatch_formatting() {
    let error = ProtocolError::checksum_mismatch(0x12345678, 0x87654321, 1030);

    let display_output = format!("{}", error);
    assert!(display_output.contains("Checksum mismatch"));
    assert!(display_output.contains("expected 0x12345678"));
    assert!(display_output.contains("calculated 0x87654321"));
    assert!(display_output.contains("covered 1030 bytes"));

    let empty = ProtocolError::checksum_mismatch(0x1, 0x0, 0);
    assert!(empty.to_string().contains("covers no bytes"));
}

#[test]
fn test_length_mismatch_formatting() {
    // total_length says 2, frame carries 5 bytes after it
    let frame = Bytes::from_static(&[0, 0, 0, 2, 1, 2, 3, 4, 5]);
    let error = parse_send_frame(frame, false).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Length mismatch in total_length: declared 2 bytes, frame carries 5"
    );
}

#[test]
fn test_frame_too_large_formatting() {
    let error = ProtocolError::frame_too_large(6_000_000, 5_253_120, 120, 5_999_800);
    let display_output = format!("{}", error);
    assert!(display_output.contains("6000000 bytes exceeds maximum 5253120"));
    assert!(display_output.contains("payload: 5999800"));
    assert!(!error.is_integrity_fault());
}

#[test]
fn test_missing_and_unexpected_formatting() {
    let missing = ProtocolError::MissingField {
        message: "CommandSend",
        field: "producer_id",
    };
    assert_eq!(missing.to_string(), "Missing required field CommandSend.producer_id");

    let unexpected = ProtocolError::UnexpectedCommand {
        expected: "SEND",
        got: "Ping".to_string(),
    };
    assert_eq!(unexpected.to_string(), "Unexpected command: expected SEND, got Ping");
}
