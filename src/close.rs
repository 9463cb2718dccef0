//! Classification of WebSocket close codes sent by the gateway.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Close code sent by the gateway or locally emitted by this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure; the client requested it.
    Normal,
    /// Unknown error occurred on the gateway's end.
    UnknownError,
    /// An invalid opcode or payload format was sent.
    UnknownOpcode,
    /// An invalid payload was sent.
    DecodeError,
    /// A payload was sent prior to identifying.
    NotAuthenticated,
    /// The account token sent was invalid.
    AuthenticationFailed,
    /// More than one identify payload was sent.
    AlreadyAuthenticated,
    /// The session sequence number was invalid.
    InvalidSeq,
    /// The client is sending payloads too quickly.
    RateLimited,
    /// The session timed out.
    SessionTimedOut,
    /// The shard sent in the identify payload is invalid.
    InvalidShard,
    /// The session would have handled too many guilds; shard it.
    ShardingRequired,
    /// An invalid gateway version was used.
    InvalidApiVersion,
    /// Invalid intent(s) were sent.
    InvalidIntents,
    /// Disallowed intent(s) were sent; an intent may have not been approved.
    DisallowedIntents,
    /// A close code not known to be used by the gateway.
    Other(u16),
}

impl CloseCode {
    /// Whether a shard may reconnect after receiving this close code.
    ///
    /// This mirrors the gateway documentation's guidance: the fatal set is
    /// an explicit allow-list of codes known to never be worth retrying;
    /// everything else, including codes this crate doesn't recognize, is
    /// assumed recoverable.
    pub const fn can_reconnect(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Numeric value of the close code.
    pub const fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::UnknownError => 4000,
            Self::UnknownOpcode => 4001,
            Self::DecodeError => 4002,
            Self::NotAuthenticated => 4003,
            Self::AuthenticationFailed => 4004,
            Self::AlreadyAuthenticated => 4005,
            Self::InvalidSeq => 4007,
            Self::RateLimited => 4008,
            Self::SessionTimedOut => 4009,
            Self::InvalidShard => 4010,
            Self::ShardingRequired => 4011,
            Self::InvalidApiVersion => 4012,
            Self::InvalidIntents => 4013,
            Self::DisallowedIntents => 4014,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSeq,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            other => Self::Other(other),
        }
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Normal => "normal closure",
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown opcode",
            Self::DecodeError => "decode error",
            Self::NotAuthenticated => "not authenticated",
            Self::AuthenticationFailed => "authentication failed",
            Self::AlreadyAuthenticated => "already authenticated",
            Self::InvalidSeq => "invalid seq",
            Self::RateLimited => "rate limited",
            Self::SessionTimedOut => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "sharding required",
            Self::InvalidApiVersion => "invalid API version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "disallowed intents",
            Self::Other(code) => return write!(f, "unrecognized close code {code}"),
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::CloseCode;

    #[test]
    fn fatal_codes_do_not_reconnect() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!CloseCode::from(code).can_reconnect(), "{code} should be fatal");
        }
    }

    #[test]
    fn recoverable_codes_reconnect() {
        for code in [1000, 4000, 4001, 4002, 4003, 4005, 4007, 4008, 4009] {
            assert!(CloseCode::from(code).can_reconnect(), "{code} should be recoverable");
        }
    }

    #[test]
    fn unknown_codes_are_recoverable() {
        assert!(CloseCode::from(9999).can_reconnect());
    }

    #[test]
    fn round_trips_numeric_value() {
        assert_eq!(4004, CloseCode::from(4004).code());
        assert_eq!(9999, CloseCode::from(9999).code());
    }
}
