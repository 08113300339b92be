// Property-based tests for send frames
//
// Random metadata and payloads are pushed through the encoder and parser to
// check that both checksum modes round-trip and that parsing never panics on
// arbitrary input.

use bytes::Bytes;
use codec::{
    compute_checksum, has_checksum, parse_message_metadata, parse_send_frame, read_checksum,
    ChecksumType, CompressionType, FrameEncoder, KeyValue, MessageMetadata, SendCommand,
};
use proptest::prelude::*;

fn compression_strategy() -> impl Strategy<Value = CompressionType> {
    prop_oneof![
        Just(CompressionType::None),
        Just(CompressionType::Lz4),
        Just(CompressionType::Zlib),
        Just(CompressionType::Zstd),
        Just(CompressionType::Snappy),
    ]
}

fn metadata_strategy() -> impl Strategy<Value = MessageMetadata> {
    (
        "[a-z0-9-]{0,24}",
        any::<u64>(),
        any::<u64>(),
        prop::collection::vec(("[a-z]{1,8}", "[ -~]{0,16}"), 0..4),
        prop::option::of("[a-z0-9]{1,12}"),
        prop::collection::vec("[a-z-]{1,10}", 0..3),
        compression_strategy(),
        prop::option::of(any::<u32>()),
        prop::option::of(1i32..1000),
        prop::option::of(any::<u64>()),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..8)),
    )
        .prop_map(
            |(
                producer_name,
                sequence_id,
                publish_time,
                properties,
                partition_key,
                replicate_to,
                compression,
                uncompressed_size,
                num_messages_in_batch,
                event_time,
                ordering_key,
            )| MessageMetadata {
                producer_name,
                sequence_id,
                publish_time,
                properties: properties
                    .into_iter()
                    .map(|(key, value)| KeyValue::new(key, value))
                    .collect(),
                partition_key,
                replicate_to,
                compression,
                uncompressed_size,
                num_messages_in_batch,
                event_time,
                ordering_key,
                ..MessageMetadata::default()
            },
        )
}

fn checksum_strategy() -> impl Strategy<Value = ChecksumType> {
    prop_oneof![Just(ChecksumType::Crc32c), Just(ChecksumType::None)]
}

proptest! {
    #[test]
    fn test_frame_roundtrip(
        metadata in metadata_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        checksum_type in checksum_strategy(),
        producer_id in any::<u64>(),
        sequence_id in any::<u64>(),
    ) {
        // Property: every frame parses back to exactly what was built
        let command = SendCommand::new(producer_id, sequence_id);
        let frame = FrameEncoder::default()
            .new_send(&command, checksum_type, &metadata, Bytes::from(payload.clone()))
            .unwrap()
            .coalesce();

        let received = parse_send_frame(frame, true).unwrap();
        prop_assert_eq!(received.command, command);
        prop_assert_eq!(received.checksum.is_present(), checksum_type == ChecksumType::Crc32c);
        prop_assert_eq!(received.metadata, metadata);
        prop_assert_eq!(&received.payload[..], &payload[..]);
    }

    #[test]
    fn test_checksum_matches_independent_computation(
        metadata in metadata_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        // Property: the transmitted checksum is CRC32C of everything after it
        let section = FrameEncoder::default()
            .serialize_metadata_and_payload(ChecksumType::Crc32c, &metadata, Bytes::from(payload))
            .unwrap()
            .coalesce();

        let mut cursor = section.clone();
        prop_assert!(has_checksum(&cursor));
        let checksum = read_checksum(&mut cursor).unwrap();
        prop_assert_eq!(checksum, compute_checksum(&section[6..]));
    }

    #[test]
    fn test_payload_offset_independent_of_checksum_read(
        metadata in metadata_strategy(),
        payload in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        // Property: explicit checksum read and direct parse land on the same byte
        let section = FrameEncoder::default()
            .serialize_metadata_and_payload(ChecksumType::Crc32c, &metadata, Bytes::from(payload))
            .unwrap()
            .coalesce();

        let mut explicit = section.clone();
        read_checksum(&mut explicit).unwrap();
        let first = parse_message_metadata(&mut explicit).unwrap();

        let mut direct = section.clone();
        let second = parse_message_metadata(&mut direct).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(explicit.len(), direct.len());
    }

    #[test]
    fn test_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        // Property: garbage yields an error or a value, never a panic
        let _ = parse_send_frame(Bytes::from(data.clone()), true);

        let mut cursor = &data[..];
        let _ = parse_message_metadata(&mut cursor);
    }
}
