//! Streaming tests: frames written to an async pipe and read back through
//! `FramedRead`, including deliveries split at awkward byte boundaries.

use bytes::Bytes;
use codec::{
    parse_send_frame, ByteBufPair, ChecksumType, FrameCodec, FrameEncoder, MessageMetadata,
    ProtocolError, SendCommand,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::FramedRead;

fn build(sequence_id: u64, payload: &'static [u8]) -> ByteBufPair {
    FrameEncoder::default()
        .new_send(
            &SendCommand::new(11, sequence_id),
            ChecksumType::Crc32c,
            &MessageMetadata::new("stream-producer", sequence_id, 0),
            Bytes::from_static(payload),
        )
        .expect("Failed to build frame")
}

#[tokio::test]
async fn test_frames_survive_byte_at_a_time_delivery() {
    let (client, server) = tokio::io::duplex(1);
    let frames = vec![build(0, b"first"), build(1, b""), build(2, b"third payload")];
    let expected: Vec<Bytes> = frames.iter().cloned().map(ByteBufPair::coalesce).collect();

    let writer = tokio::spawn(async move {
        let mut client = client;
        for frame in frames {
            frame.write_async(&mut client).await.unwrap();
        }
        client.shutdown().await.unwrap();
    });

    let mut reader = FramedRead::new(server, FrameCodec::default());
    let mut received = Vec::new();
    while let Some(frame) = reader.next().await {
        received.push(frame.unwrap());
    }
    writer.await.unwrap();

    assert_eq!(received, expected);
    for (sequence_id, frame) in received.into_iter().enumerate() {
        let send = parse_send_frame(frame, true).unwrap();
        assert_eq!(send.command.sequence_id, sequence_id as u64);
        assert_eq!(send.metadata.producer_name, "stream-producer");
    }
}

#[tokio::test]
async fn test_scatter_written_frames_read_back_in_order() {
    let (client, server) = tokio::io::duplex(4096);

    let writer = tokio::spawn(async move {
        let mut client = client;
        for sequence_id in 0..3 {
            build(sequence_id, b"scatter written").write_async(&mut client).await.unwrap();
        }
        client.shutdown().await.unwrap();
    });

    let mut reader = FramedRead::new(server, FrameCodec::default());
    for sequence_id in 0..3u64 {
        let frame = reader.next().await.unwrap().unwrap();
        let send = parse_send_frame(frame, true).unwrap();
        assert_eq!(send.command.sequence_id, sequence_id);
        assert_eq!(&send.payload[..], b"scatter written");
    }
    assert!(reader.next().await.is_none());
    writer.await.unwrap();
}

#[tokio::test]
async fn test_stream_ending_mid_frame_is_an_error() {
    let (mut client, server) = tokio::io::duplex(4096);
    let frame = build(0, b"cut short").coalesce();
    client.write_all(&frame[..frame.len() - 3]).await.unwrap();
    drop(client);

    let mut reader = FramedRead::new(server, FrameCodec::default());
    let err = reader.next().await.unwrap().unwrap_err();
    assert!(matches!(err, ProtocolError::TruncatedFrame { .. }));
}

#[tokio::test]
async fn test_oversized_declaration_rejected() {
    let (mut client, server) = tokio::io::duplex(64);
    client.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

    let mut reader = FramedRead::new(server, FrameCodec::new(1024));
    let err = reader.next().await.unwrap().unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
}
