//! The transport a [`Shard`] drives: a single duplex stream of frames to
//! and from the gateway.
//!
//! [`Connection`] exists so tests can substitute a scripted, in-process
//! implementation for the real WebSocket one; [`Shard`] itself only ever
//! depends on the trait.
//!
//! [`Shard`]: crate::Shard

use crate::tls::TlsContainer;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::{borrow::Cow, error::Error, fmt::Debug};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        protocol::{frame::coding::CloseCode as TungsteniteCloseCode, CloseFrame as TungsteniteCloseFrame},
        Message as TungsteniteMessage,
    },
    MaybeTlsStream, WebSocketStream,
};

/// Message received from or sent to the connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Message {
    /// A complete binary frame. Subject to transport decompression before
    /// JSON decoding.
    Binary(Vec<u8>),
    /// A complete text frame, already plain JSON.
    Text(Vec<u8>),
    /// The remote closed the connection, carrying the close code if one was
    /// given.
    Close(Option<u16>),
}

/// A live or mocked duplex connection to the gateway.
#[async_trait]
pub(crate) trait Connection: Debug + Send {
    /// Read the next message, blocking until one is available.
    ///
    /// Returns `None` once the connection is exhausted with no further
    /// messages to deliver.
    async fn read(&mut self) -> Option<Result<Message, Box<dyn Error + Send + Sync>>>;

    /// Send a text frame.
    async fn write(&mut self, text: String) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Close the connection with a code and reason.
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Real WebSocket-backed [`Connection`].
pub(crate) struct WebSocketConnection {
    /// Underlying duplex stream.
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection").finish_non_exhaustive()
    }
}

impl WebSocketConnection {
    /// Dial the given URL, performing the WebSocket and, if `wss`, TLS
    /// handshake.
    pub(crate) async fn connect(url: &str, tls: &TlsContainer) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(url, None, Some(tls.connector())).await?;

        Ok(Self { stream })
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn read(&mut self) -> Option<Result<Message, Box<dyn Error + Send + Sync>>> {
        loop {
            return match self.stream.next().await? {
                Ok(TungsteniteMessage::Binary(bytes)) => Some(Ok(Message::Binary(bytes))),
                Ok(TungsteniteMessage::Text(text)) => Some(Ok(Message::Text(text.into_bytes()))),
                Ok(TungsteniteMessage::Close(frame)) => {
                    Some(Ok(Message::Close(frame.map(|frame| u16::from(frame.code)))))
                }
                Ok(TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_) | TungsteniteMessage::Frame(_)) => {
                    continue
                }
                Err(source) => Some(Err(Box::new(source))),
            };
        }
    }

    async fn write(&mut self, text: String) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.stream.send(TungsteniteMessage::Text(text)).await?;

        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let frame = TungsteniteCloseFrame {
            code: TungsteniteCloseCode::from(code),
            reason: Cow::Owned(reason.to_owned()),
        };

        self.stream.send(TungsteniteMessage::Close(Some(frame))).await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Connection, Message};
    use async_trait::async_trait;
    use std::{collections::VecDeque, error::Error};
    use tokio::sync::mpsc::UnboundedSender;

    /// Scripted in-process [`Connection`] driven by pre-seeded frames.
    #[derive(Debug)]
    pub(crate) struct MockConnection {
        /// Frames to hand back from `read`, in order.
        pub(crate) inbound: VecDeque<Result<Message, String>>,
        /// Text frames passed to `write`, in order.
        pub(crate) outbound: Vec<String>,
        /// Notified with every frame written, for tests that need to observe
        /// writes as they happen rather than after the fact.
        pub(crate) on_write: Option<UnboundedSender<String>>,
    }

    impl MockConnection {
        pub(crate) fn new(inbound: Vec<Result<Message, String>>) -> Self {
            Self {
                inbound: inbound.into(),
                outbound: Vec::new(),
                on_write: None,
            }
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn read(&mut self) -> Option<Result<Message, Box<dyn Error + Send + Sync>>> {
            self.inbound
                .pop_front()
                .map(|result| result.map_err(|message| message.into()))
        }

        async fn write(&mut self, text: String) -> Result<(), Box<dyn Error + Send + Sync>> {
            if let Some(sender) = &self.on_write {
                let _ = sender.send(text.clone());
            }

            self.outbound.push(text);

            Ok(())
        }

        async fn close(&mut self, code: u16, reason: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.inbound.push_back(Ok(Message::Close(Some(code))));
            let _ = reason;

            Ok(())
        }
    }
}
