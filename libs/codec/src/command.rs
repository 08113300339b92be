//! Command header encoding
//!
//! The command header is a `BaseCommand` envelope: a type discriminant plus
//! one embedded sub-command. This layer produces and consumes only the SEND
//! sub-command; any other sub-command is skipped on decode and reported by
//! [`BaseCommand::into_send`].

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{
    bytes_field_len, int32_field_len, put_int32_field, put_key, put_varint, put_varint_field,
    varint_field_len, WireMessage, WireReader, WireType,
};
use bytes::BufMut;
use types::{CommandType, SendCommand};

mod field {
    pub const TYPE: u32 = 1;
    pub const SEND: u32 = 6;

    pub const SEND_PRODUCER_ID: u32 = 1;
    pub const SEND_SEQUENCE_ID: u32 = 2;
    pub const SEND_NUM_MESSAGES: u32 = 3;
}

impl WireMessage for SendCommand {
    const NAME: &'static str = "CommandSend";

    fn encoded_len(&self) -> usize {
        varint_field_len(field::SEND_PRODUCER_ID, self.producer_id)
            + varint_field_len(field::SEND_SEQUENCE_ID, self.sequence_id)
            + self
                .num_messages
                .map_or(0, |n| int32_field_len(field::SEND_NUM_MESSAGES, n))
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_varint_field(buf, field::SEND_PRODUCER_ID, self.producer_id);
        put_varint_field(buf, field::SEND_SEQUENCE_ID, self.sequence_id);
        if let Some(n) = self.num_messages {
            put_int32_field(buf, field::SEND_NUM_MESSAGES, n);
        }
    }

    fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let mut reader = WireReader::new(data, Self::NAME);
        let mut producer_id = None;
        let mut sequence_id = None;
        let mut num_messages = None;

        while !reader.is_empty() {
            let (number, wire_type) = reader.read_key()?;
            match number {
                field::SEND_PRODUCER_ID => {
                    reader.expect_wire_type("producer_id", wire_type, WireType::Varint)?;
                    producer_id = Some(reader.read_varint("producer_id")?);
                }
                field::SEND_SEQUENCE_ID => {
                    reader.expect_wire_type("sequence_id", wire_type, WireType::Varint)?;
                    sequence_id = Some(reader.read_varint("sequence_id")?);
                }
                field::SEND_NUM_MESSAGES => {
                    reader.expect_wire_type("num_messages", wire_type, WireType::Varint)?;
                    num_messages = Some(reader.read_i32("num_messages")?);
                }
                _ => reader.skip(number, wire_type)?,
            }
        }

        Ok(SendCommand {
            producer_id: producer_id.ok_or(ProtocolError::MissingField {
                message: Self::NAME,
                field: "producer_id",
            })?,
            sequence_id: sequence_id.ok_or(ProtocolError::MissingField {
                message: Self::NAME,
                field: "sequence_id",
            })?,
            num_messages,
        })
    }
}

/// Command envelope as it appears between `command_length` and the message
/// section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCommand {
    pub command_type: CommandType,
    pub send: Option<SendCommand>,
}

impl BaseCommand {
    pub fn send(command: SendCommand) -> Self {
        Self {
            command_type: CommandType::Send,
            send: Some(command),
        }
    }

    /// Unwrap the SEND sub-command, rejecting every other command
    pub fn into_send(self) -> ProtocolResult<SendCommand> {
        if self.command_type != CommandType::Send {
            return Err(ProtocolError::UnexpectedCommand {
                expected: "SEND",
                got: format!("{:?}", self.command_type),
            });
        }
        self.send.ok_or(ProtocolError::MissingField {
            message: Self::NAME,
            field: "send",
        })
    }
}

impl WireMessage for BaseCommand {
    const NAME: &'static str = "BaseCommand";

    fn encoded_len(&self) -> usize {
        varint_field_len(field::TYPE, u64::from(u8::from(self.command_type)))
            + self
                .send
                .map_or(0, |send| bytes_field_len(field::SEND, send.encoded_len()))
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        put_varint_field(buf, field::TYPE, u64::from(u8::from(self.command_type)));
        if let Some(send) = &self.send {
            put_key(buf, field::SEND, WireType::LengthDelimited);
            put_varint(buf, send.encoded_len() as u64);
            send.encode(buf);
        }
    }

    fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let mut reader = WireReader::new(data, Self::NAME);
        let mut command_type = None;
        let mut send = None;

        while !reader.is_empty() {
            let (number, wire_type) = reader.read_key()?;
            match number {
                field::TYPE => {
                    reader.expect_wire_type("type", wire_type, WireType::Varint)?;
                    let raw = reader.read_varint("type")?;
                    let parsed = u8::try_from(raw)
                        .ok()
                        .and_then(|value| CommandType::try_from(value).ok())
                        .ok_or_else(|| ProtocolError::UnexpectedCommand {
                            expected: "SEND",
                            got: format!("unknown command type {}", raw),
                        })?;
                    command_type = Some(parsed);
                }
                field::SEND => {
                    reader.expect_wire_type("send", wire_type, WireType::LengthDelimited)?;
                    send = Some(SendCommand::decode(reader.read_bytes("send")?)?);
                }
                _ => reader.skip(number, wire_type)?,
            }
        }

        Ok(BaseCommand {
            command_type: command_type.ok_or(ProtocolError::MissingField {
                message: Self::NAME,
                field: "type",
            })?,
            send,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::put_bytes_field;

    #[test]
    fn test_send_command_layout() {
        let command = BaseCommand::send(SendCommand::new(1, 0));
        let bytes = command.encode_to_vec();
        // type=SEND, then send={producer_id=1, sequence_id=0}
        assert_eq!(bytes, vec![0x08, 0x06, 0x32, 0x04, 0x08, 0x01, 0x10, 0x00]);
        assert_eq!(bytes.len(), command.encoded_len());
    }

    #[test]
    fn test_send_command_roundtrip_with_count() {
        let command = BaseCommand::send(SendCommand::new(u64::MAX, 1 << 40).with_num_messages(10));
        let bytes = command.encode_to_vec();
        assert_eq!(bytes.len(), command.encoded_len());

        let decoded = BaseCommand::decode(&bytes).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(decoded.into_send().unwrap().num_messages, Some(10));
    }

    #[test]
    fn test_non_send_command_rejected() {
        let mut bytes = Vec::new();
        put_varint_field(&mut bytes, 1, u64::from(u8::from(CommandType::Ping)));
        put_bytes_field(&mut bytes, 18, &[]);

        let decoded = BaseCommand::decode(&bytes).unwrap();
        assert_eq!(decoded.command_type, CommandType::Ping);
        let err = decoded.into_send().unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedCommand { .. }));
    }

    #[test]
    fn test_unknown_command_type_rejected() {
        let mut bytes = Vec::new();
        put_varint_field(&mut bytes, 1, 200);
        assert!(matches!(
            BaseCommand::decode(&bytes),
            Err(ProtocolError::UnexpectedCommand { .. })
        ));
    }

    #[test]
    fn test_missing_required_fields() {
        let mut bytes = Vec::new();
        put_varint_field(&mut bytes, 1, 42);
        assert!(matches!(
            SendCommand::decode(&bytes),
            Err(ProtocolError::MissingField { field: "sequence_id", .. })
        ));

        assert!(matches!(
            BaseCommand::decode(&[]),
            Err(ProtocolError::MissingField { field: "type", .. })
        ));
    }
}
