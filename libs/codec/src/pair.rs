//! # Buffer Pair
//!
//! ## Purpose
//!
//! Two independently owned byte ranges, a freshly built header and the
//! caller's payload, that behave as one logical stream for checksumming,
//! transmission and lifetime tracking. The payload keeps its original
//! allocation the whole way to the socket.
//!
//! ## Lifetime
//!
//! Both ranges are [`Bytes`] handles, so retaining the pair retains both
//! constituents and dropping the last handle returns each one to its own
//! allocator (the header to the [`BufferPool`](crate::pool::BufferPool) it came
//! from, the payload to whoever allocated it).
//!
//! ## Coalescing
//!
//! [`ByteBufPair::coalesce`] takes the pair by value. Reusing the
//! constituents afterwards is therefore rejected by the compiler rather than
//! detected at runtime. The normal transmission path never coalesces:
//! [`ByteBufPair::write_to`] and [`ByteBufPair::write_async`] scatter-write the
//! two ranges directly.

use crate::checksum::compute_checksum_chunks;
use bytes::buf::Chain;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{self, IoSlice, Write};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Header range plus payload range forming one logical frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBufPair {
    header: Bytes,
    payload: Bytes,
}

impl ByteBufPair {
    /// Pair two ranges without copying either
    pub fn new(header: Bytes, payload: Bytes) -> Self {
        Self { header, payload }
    }

    pub fn header(&self) -> &Bytes {
        &self.header
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total logical length
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.payload.is_empty()
    }

    /// Another handle to the same two ranges
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Drop this handle; each range is freed once its last handle is gone
    pub fn release(self) {
        drop(self);
    }

    /// Both ranges in stream order
    pub fn chunks(&self) -> [&[u8]; 2] {
        [&self.header, &self.payload]
    }

    /// CRC32C over the logical stream
    pub fn checksum(&self) -> u32 {
        compute_checksum_chunks(self.chunks())
    }

    /// Copy both ranges, in order, into one new contiguous range
    pub fn coalesce(self) -> Bytes {
        let mut merged = BytesMut::with_capacity(self.len());
        merged.put_slice(&self.header);
        merged.put_slice(&self.payload);
        merged.freeze()
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.header, self.payload)
    }

    /// View as a single `Buf` that walks the header then the payload
    pub fn into_buf(self) -> Chain<Bytes, Bytes> {
        self.header.chain(self.payload)
    }

    /// Slices for a vectored write
    pub fn io_slices(&self) -> [IoSlice<'_>; 2] {
        [IoSlice::new(&self.header), IoSlice::new(&self.payload)]
    }

    /// Scatter-write the whole pair, retrying partial writes
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut remaining = self.clone().into_buf();
        while remaining.has_remaining() {
            let mut slices = [IoSlice::new(&[]); 2];
            let count = remaining.chunks_vectored(&mut slices);
            let written = match writer.write_vectored(&slices[..count]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write frame",
                    ))
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            remaining.advance(written);
        }
        Ok(())
    }

    /// Scatter-write the whole pair to an async transport, consuming it
    pub async fn write_async<W>(self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = self.into_buf();
        writer.write_all_buf(&mut buf).await
    }
}

/// A frame as handed to the transport: already contiguous, or still split
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBuf {
    Single(Bytes),
    Pair(ByteBufPair),
}

impl FrameBuf {
    pub fn len(&self) -> usize {
        match self {
            FrameBuf::Single(bytes) => bytes.len(),
            FrameBuf::Pair(pair) => pair.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize as one contiguous range; a `Single` is returned as is
    pub fn coalesce(self) -> Bytes {
        match self {
            FrameBuf::Single(bytes) => bytes,
            FrameBuf::Pair(pair) => pair.coalesce(),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            FrameBuf::Single(bytes) => writer.write_all(bytes),
            FrameBuf::Pair(pair) => pair.write_to(writer),
        }
    }
}

impl From<Bytes> for FrameBuf {
    fn from(bytes: Bytes) -> Self {
        FrameBuf::Single(bytes)
    }
}

impl From<ByteBufPair> for FrameBuf {
    fn from(pair: ByteBufPair) -> Self {
        FrameBuf::Pair(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::compute_checksum;

    /// Accepts at most `limit` bytes per call
    struct TrickleWriter {
        out: Vec<u8>,
        limit: usize,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Records where each buffer handed to `poll_write` starts
    #[derive(Default)]
    struct AddressRecorder {
        starts: Vec<usize>,
        written: usize,
    }

    impl AsyncWrite for AddressRecorder {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            self.starts.push(buf.as_ptr() as usize);
            self.written += buf.len();
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    fn sample() -> ByteBufPair {
        ByteBufPair::new(Bytes::from_static(b"head:"), Bytes::from(vec![7u8; 32]))
    }

    #[test]
    fn test_pair_does_not_copy() {
        let payload = Bytes::from(vec![1u8; 256]);
        let pair = ByteBufPair::new(Bytes::from_static(b"h"), payload.clone());
        assert_eq!(pair.payload().as_ptr(), payload.as_ptr());
        assert_eq!(pair.len(), 257);
    }

    #[test]
    fn test_coalesce_concatenates_in_order() {
        let pair = sample();
        let mut expected = b"head:".to_vec();
        expected.extend_from_slice(&[7u8; 32]);

        let checksum = pair.checksum();
        let merged = pair.coalesce();
        assert_eq!(&merged[..], &expected[..]);
        assert_eq!(checksum, compute_checksum(&merged));
    }

    #[test]
    fn test_retain_shares_ranges() {
        let pair = sample();
        let retained = pair.retain();
        assert_eq!(retained.header().as_ptr(), pair.header().as_ptr());
        assert_eq!(retained.payload().as_ptr(), pair.payload().as_ptr());
        pair.release();
        assert_eq!(retained.len(), 37);
    }

    #[test]
    fn test_write_to_handles_short_writes() {
        let pair = sample();
        let mut writer = TrickleWriter {
            out: Vec::new(),
            limit: 3,
        };
        pair.write_to(&mut writer).unwrap();
        assert_eq!(writer.out, pair.coalesce().to_vec());
    }

    #[test]
    fn test_write_to_reports_write_zero() {
        let mut writer = TrickleWriter {
            out: Vec::new(),
            limit: 0,
        };
        let err = sample().write_to(&mut writer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_empty_payload() {
        let pair = ByteBufPair::new(Bytes::from_static(b"only header"), Bytes::new());
        assert!(!pair.is_empty());
        let slices = pair.io_slices();
        assert_eq!(slices[1].len(), 0);
        assert_eq!(&pair.coalesce()[..], b"only header");
    }

    #[test]
    fn test_frame_buf_variants() {
        let single = FrameBuf::from(Bytes::from_static(b"abc"));
        assert_eq!(single.len(), 3);
        assert_eq!(&single.coalesce()[..], b"abc");

        let pair = FrameBuf::from(sample());
        let mut out = Vec::new();
        pair.write_to(&mut out).unwrap();
        assert_eq!(out.len(), pair.len());
        assert_eq!(pair.coalesce().to_vec(), out);
    }

    #[tokio::test]
    async fn test_write_async() {
        let mut out = Vec::new();
        let pair = sample();
        let expected = pair.clone().coalesce();
        pair.write_async(&mut out).await.unwrap();
        assert_eq!(out, expected.to_vec());
    }

    #[tokio::test]
    async fn test_write_async_passes_payload_memory_through() {
        let payload = Bytes::from(vec![0x5Au8; 1024 * 1024]);
        let pair = ByteBufPair::new(Bytes::from_static(b"hdr"), payload.clone());

        let mut transport = AddressRecorder::default();
        pair.write_async(&mut transport).await.unwrap();

        assert_eq!(transport.written, 3 + payload.len());
        assert!(transport.starts.contains(&(payload.as_ptr() as usize)));
    }
}
