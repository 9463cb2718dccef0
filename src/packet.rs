//! The JSON envelope exchanged with the gateway, and the handful of
//! payloads this crate interprets directly.
//!
//! Every other dispatch payload is handed to the caller still encoded as a
//! [`serde_json::Value`]; see the crate documentation for why.

use crate::config::IdentifyProperties;
use serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::convert::TryFrom;

bitflags::bitflags! {
    /// Intents that determine which dispatch events the gateway will send.
    ///
    /// Bit values match the upstream gateway documentation; unrecognized
    /// bits round-trip unchanged rather than being rejected.
    #[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete and related role/channel events.
        const GUILDS = 1 << 0;
        /// Guild member add/update/remove events.
        const GUILD_MEMBERS = 1 << 1;
        /// Guild ban add/remove events.
        const GUILD_MODERATION = 1 << 2;
        /// Guild emoji and sticker update events.
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        /// Guild integration update events.
        const GUILD_INTEGRATIONS = 1 << 4;
        /// Guild webhook update events.
        const GUILD_WEBHOOKS = 1 << 5;
        /// Guild invite create/delete events.
        const GUILD_INVITES = 1 << 6;
        /// Guild voice state update events.
        const GUILD_VOICE_STATES = 1 << 7;
        /// Guild presence update events.
        const GUILD_PRESENCES = 1 << 8;
        /// Guild message create/update/delete events.
        const GUILD_MESSAGES = 1 << 9;
        /// Guild message reaction events.
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        /// Guild typing start events.
        const GUILD_MESSAGE_TYPING = 1 << 11;
        /// Direct message create/update/delete events.
        const DIRECT_MESSAGES = 1 << 12;
        /// Direct message reaction events.
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        /// Direct message typing start events.
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        /// Message content in dispatched message payloads.
        const MESSAGE_CONTENT = 1 << 15;
        /// Guild scheduled event create/update/delete events.
        const GUILD_SCHEDULED_EVENTS = 1 << 16;
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Intents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u64::deserialize(deserializer)?;

        Ok(Self::from_bits_truncate(bits))
    }
}

/// Opcode of an envelope exchanged with the gateway.
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[non_exhaustive]
#[repr(u8)]
pub enum Opcode {
    /// An event was dispatched.
    Dispatch = 0,
    /// Fired periodically by the client to keep the connection alive, and
    /// fired by the gateway to request an immediate heartbeat.
    Heartbeat = 1,
    /// Start a new session during the initial handshake.
    Identify = 2,
    /// Resume a previous session that was disconnected.
    Resume = 6,
    /// The gateway is asking the client to reconnect and resume.
    Reconnect = 7,
    /// The session has been invalidated; the client should either resume or
    /// reidentify depending on the payload.
    InvalidSession = 9,
    /// Sent immediately after connecting, contains the heartbeat interval.
    Hello = 10,
    /// Acknowledges a client heartbeat.
    HeartbeatAck = 11,
}

/// Envelope received from the gateway.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReceivePacket {
    /// Opcode denoting the envelope's purpose.
    pub op: Opcode,
    /// Event-specific data.
    pub d: serde_json::Value,
    /// Sequence number of this envelope, present only on [`Opcode::Dispatch`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Dispatch event name, present only on [`Opcode::Dispatch`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

/// Envelope sent to the gateway.
#[derive(Clone, Debug, Serialize)]
pub struct SendPacket<T> {
    /// Opcode denoting the envelope's purpose.
    pub op: Opcode,
    /// Event-specific data.
    pub d: T,
}

/// Payload of a [`Opcode::Hello`] envelope.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Hello {
    /// Interval, in milliseconds, at which the client must heartbeat.
    pub heartbeat_interval: u64,
}

/// Payload of an [`Opcode::Identify`] envelope.
#[derive(Clone, Debug, Serialize)]
pub struct Identify {
    /// Authentication token.
    pub token: Box<str>,
    /// Intents requested for this session.
    pub intents: Intents,
    /// Identifying properties.
    pub properties: IdentifyProperties,
    /// `(shard_index, shard_count)` partition this connection handles.
    pub shard: [u32; 2],
    /// Initial presence to set, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<serde_json::Value>,
}

/// Payload of a [`Opcode::Resume`] envelope.
#[derive(Clone, Debug, Serialize)]
pub struct Resume {
    /// Authentication token.
    pub token: Box<str>,
    /// Session ID to resume.
    pub session_id: Box<str>,
    /// Last sequence number observed before disconnecting.
    pub seq: u64,
}

/// Minimal subset of the `READY` dispatch payload this crate inspects to
/// learn the new session's ID and resume URL.
#[derive(Clone, Debug, Deserialize)]
pub struct Ready {
    /// Session ID granted for this connection.
    pub session_id: Box<str>,
    /// URL to use for a future resume, if the gateway advertised one.
    #[serde(default)]
    pub resume_gateway_url: Option<Box<str>>,
}

/// Payload of an [`Opcode::InvalidSession`] envelope.
///
/// `true` means the session is resumable after a short, randomized delay;
/// `false` means the client must reidentify from scratch.
pub type InvalidSession = bool;

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            other => return Err(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Intents, Opcode, ReceivePacket};

    #[test]
    fn intents_bits_are_stable() {
        assert_eq!(1, Intents::GUILDS.bits());
        assert_eq!(1 << 9, Intents::GUILD_MESSAGES.bits());
        assert_eq!(1 << 15, Intents::MESSAGE_CONTENT.bits());
    }

    #[test]
    fn deserializes_dispatch_envelope() {
        let json = r#"{"op":0,"d":{"foo":"bar"},"s":42,"t":"RESUMED"}"#;
        let packet: ReceivePacket = serde_json::from_str(json).unwrap();

        assert_eq!(Opcode::Dispatch, packet.op);
        assert_eq!(Some(42), packet.s);
        assert_eq!(Some("RESUMED".to_owned()), packet.t);
    }

    #[test]
    fn deserializes_hello_envelope_without_seq_or_type() {
        let json = r#"{"op":10,"d":{"heartbeat_interval":41250}}"#;
        let packet: ReceivePacket = serde_json::from_str(json).unwrap();

        assert_eq!(Opcode::Hello, packet.op);
        assert_eq!(None, packet.s);
        assert_eq!(None, packet.t);
    }
}
