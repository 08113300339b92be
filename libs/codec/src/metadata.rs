//! Message metadata encoding
//!
//! Field numbers follow the protocol schema and must never be reused.
//! Fields holding their default are omitted, so an empty record encodes to
//! zero bytes and `metadata_length` on the wire is 0. Encryption fields
//! (13-15) are not modeled and are skipped like any unknown field.

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{
    bytes_field_len, int32_field_len, put_bytes_field, put_int32_field, put_key, put_varint,
    put_varint_field, varint_field_len, WireMessage, WireReader, WireType,
};
use bytes::BufMut;
use types::{CompressionType, KeyValue, MessageMetadata};

mod field {
    pub const PRODUCER_NAME: u32 = 1;
    pub const SEQUENCE_ID: u32 = 2;
    pub const PUBLISH_TIME: u32 = 3;
    pub const PROPERTIES: u32 = 4;
    pub const REPLICATED_FROM: u32 = 5;
    pub const PARTITION_KEY: u32 = 6;
    pub const REPLICATE_TO: u32 = 7;
    pub const COMPRESSION: u32 = 8;
    pub const UNCOMPRESSED_SIZE: u32 = 9;
    pub const NUM_MESSAGES_IN_BATCH: u32 = 11;
    pub const EVENT_TIME: u32 = 12;
    pub const SCHEMA_VERSION: u32 = 16;
    pub const PARTITION_KEY_B64_ENCODED: u32 = 17;
    pub const ORDERING_KEY: u32 = 18;

    pub const KV_KEY: u32 = 1;
    pub const KV_VALUE: u32 = 2;
}

fn key_value_len(kv: &KeyValue) -> usize {
    bytes_field_len(field::KV_KEY, kv.key.len()) + bytes_field_len(field::KV_VALUE, kv.value.len())
}

impl WireMessage for KeyValue {
    const NAME: &'static str = "KeyValue";

    fn encoded_len(&self) -> usize {
        key_value_len(self)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_bytes_field(buf, field::KV_KEY, self.key.as_bytes());
        put_bytes_field(buf, field::KV_VALUE, self.value.as_bytes());
    }

    fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let mut reader = WireReader::new(data, Self::NAME);
        let mut kv = KeyValue::default();

        while !reader.is_empty() {
            let (number, wire_type) = reader.read_key()?;
            match number {
                field::KV_KEY => {
                    reader.expect_wire_type("key", wire_type, WireType::LengthDelimited)?;
                    kv.key = reader.read_string("key")?;
                }
                field::KV_VALUE => {
                    reader.expect_wire_type("value", wire_type, WireType::LengthDelimited)?;
                    kv.value = reader.read_string("value")?;
                }
                _ => reader.skip(number, wire_type)?,
            }
        }

        Ok(kv)
    }
}

impl WireMessage for MessageMetadata {
    const NAME: &'static str = "MessageMetadata";

    fn encoded_len(&self) -> usize {
        let mut size = 0;

        if !self.producer_name.is_empty() {
            size += bytes_field_len(field::PRODUCER_NAME, self.producer_name.len());
        }
        if self.sequence_id != 0 {
            size += varint_field_len(field::SEQUENCE_ID, self.sequence_id);
        }
        if self.publish_time != 0 {
            size += varint_field_len(field::PUBLISH_TIME, self.publish_time);
        }
        size += self
            .properties
            .iter()
            .map(|kv| bytes_field_len(field::PROPERTIES, key_value_len(kv)))
            .sum::<usize>();
        if let Some(cluster) = &self.replicated_from {
            size += bytes_field_len(field::REPLICATED_FROM, cluster.len());
        }
        if let Some(key) = &self.partition_key {
            size += bytes_field_len(field::PARTITION_KEY, key.len());
        }
        size += self
            .replicate_to
            .iter()
            .map(|cluster| bytes_field_len(field::REPLICATE_TO, cluster.len()))
            .sum::<usize>();
        if self.compression != CompressionType::None {
            size += varint_field_len(field::COMPRESSION, u64::from(u8::from(self.compression)));
        }
        if let Some(uncompressed) = self.uncompressed_size {
            size += varint_field_len(field::UNCOMPRESSED_SIZE, u64::from(uncompressed));
        }
        if let Some(count) = self.num_messages_in_batch {
            size += int32_field_len(field::NUM_MESSAGES_IN_BATCH, count);
        }
        if let Some(event_time) = self.event_time {
            size += varint_field_len(field::EVENT_TIME, event_time);
        }
        if let Some(version) = &self.schema_version {
            size += bytes_field_len(field::SCHEMA_VERSION, version.len());
        }
        if self.partition_key_b64_encoded.is_some() {
            size += varint_field_len(field::PARTITION_KEY_B64_ENCODED, 1);
        }
        if let Some(key) = &self.ordering_key {
            size += bytes_field_len(field::ORDERING_KEY, key.len());
        }

        size
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        if !self.producer_name.is_empty() {
            put_bytes_field(buf, field::PRODUCER_NAME, self.producer_name.as_bytes());
        }
        if self.sequence_id != 0 {
            put_varint_field(buf, field::SEQUENCE_ID, self.sequence_id);
        }
        if self.publish_time != 0 {
            put_varint_field(buf, field::PUBLISH_TIME, self.publish_time);
        }
        for kv in &self.properties {
            // Embedded message: length prefix, then the KeyValue fields
            put_key(buf, field::PROPERTIES, WireType::LengthDelimited);
            put_varint(buf, key_value_len(kv) as u64);
            kv.encode(buf);
        }
        if let Some(cluster) = &self.replicated_from {
            put_bytes_field(buf, field::REPLICATED_FROM, cluster.as_bytes());
        }
        if let Some(key) = &self.partition_key {
            put_bytes_field(buf, field::PARTITION_KEY, key.as_bytes());
        }
        for cluster in &self.replicate_to {
            put_bytes_field(buf, field::REPLICATE_TO, cluster.as_bytes());
        }
        if self.compression != CompressionType::None {
            put_varint_field(buf, field::COMPRESSION, u64::from(u8::from(self.compression)));
        }
        if let Some(uncompressed) = self.uncompressed_size {
            put_varint_field(buf, field::UNCOMPRESSED_SIZE, u64::from(uncompressed));
        }
        if let Some(count) = self.num_messages_in_batch {
            put_int32_field(buf, field::NUM_MESSAGES_IN_BATCH, count);
        }
        if let Some(event_time) = self.event_time {
            put_varint_field(buf, field::EVENT_TIME, event_time);
        }
        if let Some(version) = &self.schema_version {
            put_bytes_field(buf, field::SCHEMA_VERSION, version);
        }
        if let Some(encoded) = self.partition_key_b64_encoded {
            put_varint_field(buf, field::PARTITION_KEY_B64_ENCODED, u64::from(encoded));
        }
        if let Some(key) = &self.ordering_key {
            put_bytes_field(buf, field::ORDERING_KEY, key);
        }
    }

    fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let mut reader = WireReader::new(data, Self::NAME);
        let mut metadata = MessageMetadata::default();

        while !reader.is_empty() {
            let (number, wire_type) = reader.read_key()?;
            match number {
                field::PRODUCER_NAME => {
                    reader.expect_wire_type("producer_name", wire_type, WireType::LengthDelimited)?;
                    metadata.producer_name = reader.read_string("producer_name")?;
                }
                field::SEQUENCE_ID => {
                    reader.expect_wire_type("sequence_id", wire_type, WireType::Varint)?;
                    metadata.sequence_id = reader.read_varint("sequence_id")?;
                }
                field::PUBLISH_TIME => {
                    reader.expect_wire_type("publish_time", wire_type, WireType::Varint)?;
                    metadata.publish_time = reader.read_varint("publish_time")?;
                }
                field::PROPERTIES => {
                    reader.expect_wire_type("properties", wire_type, WireType::LengthDelimited)?;
                    let embedded = reader.read_bytes("properties")?;
                    metadata.properties.push(KeyValue::decode(embedded)?);
                }
                field::REPLICATED_FROM => {
                    reader.expect_wire_type("replicated_from", wire_type, WireType::LengthDelimited)?;
                    metadata.replicated_from = Some(reader.read_string("replicated_from")?);
                }
                field::PARTITION_KEY => {
                    reader.expect_wire_type("partition_key", wire_type, WireType::LengthDelimited)?;
                    metadata.partition_key = Some(reader.read_string("partition_key")?);
                }
                field::REPLICATE_TO => {
                    reader.expect_wire_type("replicate_to", wire_type, WireType::LengthDelimited)?;
                    metadata.replicate_to.push(reader.read_string("replicate_to")?);
                }
                field::COMPRESSION => {
                    reader.expect_wire_type("compression", wire_type, WireType::Varint)?;
                    let offset = reader.position();
                    let raw = reader.read_varint("compression")?;
                    metadata.compression = u8::try_from(raw)
                        .ok()
                        .and_then(|value| CompressionType::try_from(value).ok())
                        .ok_or_else(|| {
                            ProtocolError::malformed_field(
                                Self::NAME,
                                "compression",
                                offset,
                                format!("unknown compression type {}", raw),
                            )
                        })?;
                }
                field::UNCOMPRESSED_SIZE => {
                    reader.expect_wire_type("uncompressed_size", wire_type, WireType::Varint)?;
                    metadata.uncompressed_size = Some(reader.read_u32("uncompressed_size")?);
                }
                field::NUM_MESSAGES_IN_BATCH => {
                    reader.expect_wire_type("num_messages_in_batch", wire_type, WireType::Varint)?;
                    metadata.num_messages_in_batch = Some(reader.read_i32("num_messages_in_batch")?);
                }
                field::EVENT_TIME => {
                    reader.expect_wire_type("event_time", wire_type, WireType::Varint)?;
                    metadata.event_time = Some(reader.read_varint("event_time")?);
                }
                field::SCHEMA_VERSION => {
                    reader.expect_wire_type("schema_version", wire_type, WireType::LengthDelimited)?;
                    metadata.schema_version = Some(reader.read_bytes("schema_version")?.to_vec());
                }
                field::PARTITION_KEY_B64_ENCODED => {
                    reader.expect_wire_type(
                        "partition_key_b64_encoded",
                        wire_type,
                        WireType::Varint,
                    )?;
                    metadata.partition_key_b64_encoded =
                        Some(reader.read_bool("partition_key_b64_encoded")?);
                }
                field::ORDERING_KEY => {
                    reader.expect_wire_type("ordering_key", wire_type, WireType::LengthDelimited)?;
                    metadata.ordering_key = Some(reader.read_bytes("ordering_key")?.to_vec());
                }
                _ => reader.skip(number, wire_type)?,
            }
        }

        Ok(metadata)
    }
}
