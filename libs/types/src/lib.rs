//! # Pub/Sub Protocol Types
//!
//! Pure data structures shared by the send path and the receive path of the
//! pub/sub wire protocol. Nothing in this crate knows how bytes are laid out
//! on the wire; encoding rules live in the `codec` crate.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → transport
//!     ↑            ↓            ↓
//! Pure Data    Framing Rules   Sockets
//! Metadata     Checksums       Scatter-write
//! SendCommand  Encode/Decode
//! ```
//!
//! ## What This Crate Contains
//! - [`MessageMetadata`]: per-message metadata record (producer, sequence, times, properties)
//! - [`KeyValue`]: a single user property
//! - [`CompressionType`]: payload compression codec identifier
//! - [`SendCommand`]: the identifiers carried by the SEND command header
//! - [`CommandType`]: control command discriminants

pub mod command;
pub mod metadata;

pub use command::{CommandType, SendCommand};
pub use metadata::{CompressionType, KeyValue, MessageMetadata};
