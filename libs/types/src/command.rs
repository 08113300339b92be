//! Command header types
//!
//! Only the SEND command is modeled in full. The other discriminants exist
//! so a decoder can name what it received when it expected a SEND.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Control command discriminant as carried in the command header
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TryFromPrimitive, IntoPrimitive,
)]
pub enum CommandType {
    Connect = 2,
    Connected = 3,
    Subscribe = 4,
    Producer = 5,
    Send = 6,
    SendReceipt = 7,
    SendError = 8,
    Message = 9,
    Ack = 10,
    Flow = 11,
    Unsubscribe = 12,
    Success = 13,
    Error = 14,
    CloseProducer = 15,
    CloseConsumer = 16,
    ProducerSuccess = 17,
    Ping = 18,
    Pong = 19,
}

/// Identifiers carried by the SEND command that precedes each message
///
/// The framing layer passes these through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SendCommand {
    pub producer_id: u64,
    pub sequence_id: u64,
    /// Messages in the payload; absent means one
    #[serde(default)]
    pub num_messages: Option<i32>,
}

impl SendCommand {
    pub fn new(producer_id: u64, sequence_id: u64) -> Self {
        Self {
            producer_id,
            sequence_id,
            num_messages: None,
        }
    }

    pub fn with_num_messages(mut self, num_messages: i32) -> Self {
        self.num_messages = Some(num_messages);
        self
    }
}
