//! Message metadata record
//!
//! Every published message carries one [`MessageMetadata`] next to its
//! payload. The record is owned by the producer until it is handed to the
//! frame encoder; on the receive side a fresh record is rebuilt from the
//! frame bytes.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Compression codec applied to the payload before framing
///
/// Discriminants are the on-wire enum values and must never change.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompressionType {
    #[default]
    None = 0,
    Lz4 = 1,
    Zlib = 2,
    Zstd = 3,
    Snappy = 4,
}

/// A single user-defined message property
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Per-message metadata
///
/// Scalar fields hold their protocol default when unset (empty string, zero,
/// [`CompressionType::None`]); fields the protocol marks optional are
/// `Option`s so that an explicit zero can be told apart from "not set".
/// `Default` yields the empty record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Name of the producer that published the message
    pub producer_name: String,
    /// Producer-assigned sequence id, used for de-duplication
    pub sequence_id: u64,
    /// Publish timestamp in milliseconds since the Unix epoch
    pub publish_time: u64,
    /// User properties in insertion order
    #[serde(default)]
    pub properties: Vec<KeyValue>,
    /// Cluster the message was replicated from
    #[serde(default)]
    pub replicated_from: Option<String>,
    /// Routing key used for partition selection
    #[serde(default)]
    pub partition_key: Option<String>,
    /// Restricts geo-replication to these clusters
    #[serde(default)]
    pub replicate_to: Vec<String>,
    #[serde(default)]
    pub compression: CompressionType,
    /// Payload size before compression
    #[serde(default)]
    pub uncompressed_size: Option<u32>,
    /// Number of messages packed in the payload when batching upstream
    #[serde(default)]
    pub num_messages_in_batch: Option<i32>,
    /// Application-defined event timestamp
    #[serde(default)]
    pub event_time: Option<u64>,
    #[serde(default)]
    pub schema_version: Option<Vec<u8>>,
    /// Whether `partition_key` holds base64-encoded binary
    #[serde(default)]
    pub partition_key_b64_encoded: Option<bool>,
    /// Key used for ordering under key-shared subscriptions
    #[serde(default)]
    pub ordering_key: Option<Vec<u8>>,
}

impl MessageMetadata {
    /// Create metadata carrying the three fields every producer sets
    pub fn new(producer_name: impl Into<String>, sequence_id: u64, publish_time: u64) -> Self {
        Self {
            producer_name: producer_name.into(),
            sequence_id,
            publish_time,
            ..Self::default()
        }
    }

    /// Append a user property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push(KeyValue::new(key, value));
        self
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_ordering_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.ordering_key = Some(key.into());
        self
    }

    pub fn with_event_time(mut self, event_time: u64) -> Self {
        self.event_time = Some(event_time);
        self
    }

    /// Record the codec applied upstream and the original payload size
    pub fn with_compression(mut self, compression: CompressionType, uncompressed_size: u32) -> Self {
        self.compression = compression;
        self.uncompressed_size = Some(uncompressed_size);
        self
    }

    pub fn with_batch_size(mut self, num_messages: i32) -> Self {
        self.num_messages_in_batch = Some(num_messages);
        self
    }

    pub fn with_replicated_from(mut self, cluster: impl Into<String>) -> Self {
        self.replicated_from = Some(cluster.into());
        self
    }

    pub fn with_replicate_to(mut self, clusters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.replicate_to.extend(clusters.into_iter().map(Into::into));
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<Vec<u8>>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Look up the first property with the given key
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }

    /// Number of logical messages the payload represents
    pub fn message_count(&self) -> i32 {
        self.num_messages_in_batch.unwrap_or(1)
    }

    /// True when no field differs from its default
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let metadata = MessageMetadata::new("prod-name", 7, 1_700_000_000_000)
            .with_property("region", "eu")
            .with_partition_key("user-42")
            .with_compression(CompressionType::Zstd, 4096)
            .with_batch_size(3);

        assert_eq!(metadata.producer_name, "prod-name");
        assert_eq!(metadata.sequence_id, 7);
        assert_eq!(metadata.property("region"), Some("eu"));
        assert_eq!(metadata.property("missing"), None);
        assert_eq!(metadata.partition_key.as_deref(), Some("user-42"));
        assert_eq!(metadata.compression, CompressionType::Zstd);
        assert_eq!(metadata.uncompressed_size, Some(4096));
        assert_eq!(metadata.message_count(), 3);
    }

    #[test]
    fn test_empty_record() {
        assert!(MessageMetadata::default().is_empty());
        assert!(!MessageMetadata::new("p", 0, 0).is_empty());
        assert_eq!(MessageMetadata::default().message_count(), 1);
    }

    #[test]
    fn test_compression_wire_values() {
        assert_eq!(u8::from(CompressionType::None), 0);
        assert_eq!(u8::from(CompressionType::Snappy), 4);
        assert_eq!(CompressionType::try_from(2u8).unwrap(), CompressionType::Zlib);
        assert!(CompressionType::try_from(9u8).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let metadata = MessageMetadata::new("p", 1, 2).with_replicate_to(["a", "b"]);
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"compression\":\"NONE\""));
        let back: MessageMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
