//! Protobuf-compatible field encoding primitives
//!
//! Metadata and command headers are tag-length-value records in protobuf
//! wire format with the protocol's field numbers, so generated protobuf
//! decoders can read them. Scalars holding their default value are left out,
//! including ones the `.proto` schema marks required, so a strict proto2
//! decoder may reject such records. Only the wire types the schema uses are
//! written; all wire types except groups can be skipped on read so newer
//! peers may add fields.
//!
//! Sizes are computed up front (`*_len` functions) so the frame encoder can
//! size its header range exactly before writing a single byte.

use crate::error::{ProtocolError, ProtocolResult};
use bytes::BufMut;
use num_enum::TryFromPrimitive;

/// Protobuf wire type carried in the low three bits of each field key
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

/// Longest legal varint encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Encoded size of a varint
#[inline]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

#[inline]
pub fn key_len(field_number: u32) -> usize {
    varint_len(u64::from(field_number) << 3)
}

/// Size of a varint-typed field (uint64, uint32, bool, enum)
#[inline]
pub fn varint_field_len(field_number: u32, value: u64) -> usize {
    key_len(field_number) + varint_len(value)
}

/// Size of an int32 field; negative values sign-extend to ten bytes
#[inline]
pub fn int32_field_len(field_number: u32, value: i32) -> usize {
    varint_field_len(field_number, i64::from(value) as u64)
}

/// Size of a length-delimited field (string, bytes, embedded message)
#[inline]
pub fn bytes_field_len(field_number: u32, len: usize) -> usize {
    key_len(field_number) + varint_len(len as u64) + len
}

#[inline]
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

#[inline]
pub fn put_key<B: BufMut>(buf: &mut B, field_number: u32, wire_type: WireType) {
    put_varint(buf, (u64::from(field_number) << 3) | wire_type as u64);
}

pub fn put_varint_field<B: BufMut>(buf: &mut B, field_number: u32, value: u64) {
    put_key(buf, field_number, WireType::Varint);
    put_varint(buf, value);
}

pub fn put_int32_field<B: BufMut>(buf: &mut B, field_number: u32, value: i32) {
    put_varint_field(buf, field_number, i64::from(value) as u64);
}

pub fn put_bytes_field<B: BufMut>(buf: &mut B, field_number: u32, value: &[u8]) {
    put_key(buf, field_number, WireType::LengthDelimited);
    put_varint(buf, value.len() as u64);
    buf.put_slice(value);
}

/// A record with a protobuf-compatible encoding of exactly known length
pub trait WireMessage: Sized {
    /// Message name used in decode errors
    const NAME: &'static str;

    /// Exact number of bytes [`WireMessage::encode`] will write
    fn encoded_len(&self) -> usize;

    fn encode<B: BufMut>(&self, buf: &mut B);

    fn decode(data: &[u8]) -> ProtocolResult<Self>;

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }
}

/// Cursor over one serialized message
///
/// Offsets in errors are relative to the start of the message.
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    message: &'static str,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8], message: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn malformed(&self, field: &str, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::malformed_field(self.message, field, self.pos, reason)
    }

    pub fn read_varint(&mut self, field: &str) -> ProtocolResult<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(self.malformed(field, "varint runs past end of message"));
            };
            self.pos += 1;
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(self.malformed(field, "varint overflows 64 bits"));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(self.malformed(field, "varint longer than 10 bytes"))
    }

    /// Read the next field key
    pub fn read_key(&mut self) -> ProtocolResult<(u32, WireType)> {
        let key = self.read_varint("key")?;
        let wire_type = WireType::try_from((key & 0x07) as u8)
            .map_err(|_| self.malformed("key", format!("unknown wire type {}", key & 0x07)))?;
        let field_number = u32::try_from(key >> 3)
            .ok()
            .filter(|&n| n != 0)
            .ok_or_else(|| self.malformed("key", format!("invalid field number {}", key >> 3)))?;
        Ok((field_number, wire_type))
    }

    pub fn read_bytes(&mut self, field: &str) -> ProtocolResult<&'a [u8]> {
        let len = self.read_varint(field)? as usize;
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(self.malformed(
                field,
                format!("length {} overruns message ({} bytes left)", len, remaining),
            ));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_string(&mut self, field: &str) -> ProtocolResult<String> {
        let start = self.pos;
        let bytes = self.read_bytes(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            ProtocolError::malformed_field(self.message, field, start, format!("invalid UTF-8: {}", e))
        })
    }

    pub fn read_u32(&mut self, field: &str) -> ProtocolResult<u32> {
        let value = self.read_varint(field)?;
        u32::try_from(value).map_err(|_| self.malformed(field, format!("{} exceeds u32", value)))
    }

    /// int32 values are sign-extended varints; truncation is the protobuf rule
    pub fn read_i32(&mut self, field: &str) -> ProtocolResult<i32> {
        Ok(self.read_varint(field)? as i32)
    }

    pub fn read_bool(&mut self, field: &str) -> ProtocolResult<bool> {
        Ok(self.read_varint(field)? != 0)
    }

    /// Fail unless the field arrived with the wire type the schema declares
    pub fn expect_wire_type(
        &self,
        field: &str,
        actual: WireType,
        expected: WireType,
    ) -> ProtocolResult<()> {
        if actual == expected {
            Ok(())
        } else {
            Err(self.malformed(
                field,
                format!("wire type {:?}, schema declares {:?}", actual, expected),
            ))
        }
    }

    /// Skip the value of a field this decoder does not know
    pub fn skip(&mut self, field_number: u32, wire_type: WireType) -> ProtocolResult<()> {
        let field = format!("#{}", field_number);
        match wire_type {
            WireType::Varint => {
                self.read_varint(&field)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes(&field)?;
            }
            WireType::Fixed64 => self.skip_fixed(&field, 8)?,
            WireType::Fixed32 => self.skip_fixed(&field, 4)?,
            WireType::StartGroup | WireType::EndGroup => {
                return Err(self.malformed(&field, "groups are not supported"));
            }
        }
        Ok(())
    }

    fn skip_fixed(&mut self, field: &str, width: usize) -> ProtocolResult<()> {
        if self.data.len() - self.pos < width {
            return Err(self.malformed(field, format!("fixed{} runs past end of message", width * 8)));
        }
        self.pos += width;
        Ok(())
    }
}
