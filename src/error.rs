//! Errors returned by shard operations.

use crate::close::CloseCode;
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Receiving the next message failed.
#[derive(Debug)]
pub struct ReceiveMessageError {
    /// Type of error.
    pub(crate) kind: ReceiveMessageErrorType,
    /// Source error if available.
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ReceiveMessageError {
    /// Shortcut to create a new error from a fatal close code.
    pub(crate) fn from_fatally_closed(close_code: u16) -> Self {
        Self {
            kind: ReceiveMessageErrorType::FatallyClosed { close_code },
            source: None,
        }
    }

    /// Shortcut to create a new error from a connection-level error.
    pub(crate) fn from_client(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            kind: ReceiveMessageErrorType::Client,
            source: Some(source.into()),
        }
    }

    /// Shortcut to create a new error from a decompression error.
    pub(crate) fn from_compression(source: crate::compression::CompressionError) -> Self {
        Self {
            kind: ReceiveMessageErrorType::Decompressing,
            source: Some(Box::new(source)),
        }
    }

    /// Shortcut to create a new error from a JSON deserialization error.
    pub(crate) fn from_json(source: serde_json::Error) -> Self {
        Self {
            kind: ReceiveMessageErrorType::Deserializing,
            source: Some(Box::new(source)),
        }
    }

    /// Shortcut to create a new error from a reconnect failure.
    pub(crate) fn from_reconnect(source: ShardInitializeError) -> Self {
        Self {
            kind: ReceiveMessageErrorType::Reconnect,
            source: Some(Box::new(source)),
        }
    }

    /// Shortcut to create a new error from a session store failure.
    pub(crate) fn from_store(source: crate::session::StoreError) -> Self {
        Self {
            kind: ReceiveMessageErrorType::Store,
            source: Some(Box::new(source)),
        }
    }

    /// Shortcut to create a new error from a message sending error.
    pub(crate) fn from_send(source: SendError) -> Self {
        Self {
            kind: ReceiveMessageErrorType::SendingMessage,
            source: Some(Box::new(source)),
        }
    }

    /// Whether the error is fatal.
    ///
    /// If the error is fatal then further attempts to use the shard will
    /// return more fatal errors; the shard should be dropped rather than
    /// reconnected.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ReceiveMessageErrorType::FatallyClosed { close_code }
                if !CloseCode::from(close_code).can_reconnect()
        )
    }

    /// Immutable reference to the type of error that occurred.
    pub const fn kind(&self) -> &ReceiveMessageErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source.
    pub fn into_parts(self) -> (ReceiveMessageErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for ReceiveMessageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ReceiveMessageErrorType::Client => f.write_str("websocket client error"),
            ReceiveMessageErrorType::Decompressing => {
                f.write_str("failed to decompress the message because it may be invalid")
            }
            ReceiveMessageErrorType::Deserializing => f.write_str("message is an unrecognized payload"),
            ReceiveMessageErrorType::FatallyClosed { close_code } => {
                write!(f, "shard fatally closed: {}", CloseCode::from(close_code))
            }
            ReceiveMessageErrorType::Reconnect => f.write_str("failed to reconnect to the gateway"),
            ReceiveMessageErrorType::SendingMessage => {
                f.write_str("failed to send a message over the websocket")
            }
            ReceiveMessageErrorType::Store => f.write_str("session store operation failed"),
        }
    }
}

impl Error for ReceiveMessageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// Type of [`ReceiveMessageError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ReceiveMessageErrorType {
    /// Websocket client received an error, such as an I/O or TLS error.
    Client,
    /// Decompressing a frame failed.
    Decompressing,
    /// Received gateway event failed to be deserialized.
    Deserializing,
    /// Shard has been closed due to a fatal close code.
    FatallyClosed {
        /// Close code of the close frame.
        close_code: u16,
    },
    /// Shard failed to reconnect to the gateway.
    Reconnect,
    /// Message could not be sent over the connection.
    SendingMessage,
    /// A session store read or write failed.
    ///
    /// Read failures at connect time are not surfaced this way; only write
    /// failures, which abort the current connection attempt, are.
    Store,
}

/// Sending a command failed.
#[derive(Debug)]
pub struct SendError {
    /// Type of error.
    pub(crate) kind: SendErrorType,
    /// Source error if available.
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl SendError {
    /// Immutable reference to the type of error that occurred.
    pub const fn kind(&self) -> &SendErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source.
    pub fn into_parts(self) -> (SendErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            SendErrorType::Sending => f.write_str("sending the message over the websocket failed"),
            SendErrorType::Serializing => f.write_str("serializing the value as json failed"),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// Type of [`SendError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum SendErrorType {
    /// Sending the payload over the websocket failed. Indicative of an
    /// already-closed connection.
    Sending,
    /// Serializing the payload as JSON failed.
    Serializing,
}

/// Initializing a shard and connecting to the gateway failed.
#[derive(Debug)]
pub struct ShardInitializeError {
    /// Type of error.
    pub(crate) kind: ShardInitializeErrorType,
    /// Source error if available.
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ShardInitializeError {
    /// Immutable reference to the type of error that occurred.
    pub const fn kind(&self) -> &ShardInitializeErrorType {
        &self.kind
    }

    /// Consume the error, returning the source error if there is any.
    pub fn into_source(self) -> Option<Box<dyn Error + Send + Sync>> {
        self.source
    }

    /// Consume the error, returning the owned error type and the source.
    pub fn into_parts(self) -> (ShardInitializeErrorType, Option<Box<dyn Error + Send + Sync>>) {
        (self.kind, self.source)
    }
}

impl Display for ShardInitializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ShardInitializeErrorType::Establishing => f.write_str("establishing the connection failed"),
            ShardInitializeErrorType::UrlInvalid { url } => {
                write!(f, "gateway url is invalid: {url}")
            }
        }
    }
}

impl Error for ShardInitializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// Type of [`ShardInitializeError`] that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ShardInitializeErrorType {
    /// Establishing a connection to the gateway failed.
    Establishing,
    /// Gateway URL provided via [`ConfigBuilder::gateway_url`] is invalid.
    ///
    /// [`ConfigBuilder::gateway_url`]: crate::config::ConfigBuilder
    UrlInvalid {
        /// Fully built URL, including API version and compression query
        /// parameters.
        url: String,
    },
}

impl ShardInitializeError {
    /// Shortcut to create a new error from a connection establishment
    /// failure.
    pub(crate) fn from_establishing(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            kind: ShardInitializeErrorType::Establishing,
            source: Some(source.into()),
        }
    }

    /// Shortcut to create a new error from an invalid URL.
    pub(crate) fn from_url_invalid(url: String, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            kind: ShardInitializeErrorType::UrlInvalid { url },
            source: Some(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ReceiveMessageError, ReceiveMessageErrorType, SendError, SendErrorType, ShardInitializeError,
        ShardInitializeErrorType,
    };
    use static_assertions::{assert_fields, assert_impl_all};
    use std::{error::Error, fmt::Debug};

    assert_fields!(ReceiveMessageErrorType::FatallyClosed: close_code);
    assert_fields!(ShardInitializeErrorType::UrlInvalid: url);
    assert_impl_all!(ReceiveMessageErrorType: Debug, Send, Sync);
    assert_impl_all!(ReceiveMessageError: Error, Send, Sync);
    assert_impl_all!(SendErrorType: Debug, Send, Sync);
    assert_impl_all!(SendError: Error, Send, Sync);
    assert_impl_all!(ShardInitializeErrorType: Debug, Send, Sync);
    assert_impl_all!(ShardInitializeError: Error, Send, Sync);

    #[test]
    fn fatal_close_is_fatal() {
        let error = ReceiveMessageError::from_fatally_closed(4004);
        assert!(error.is_fatal());
    }

    #[test]
    fn recoverable_close_is_not_fatal() {
        let error = ReceiveMessageError::from_fatally_closed(1000);
        assert!(!error.is_fatal());
    }
}
