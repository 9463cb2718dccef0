#![allow(
    clippy::let_unit_value,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::semicolon_if_nothing_returned
)]
#![deny(
    clippy::all,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unsafe_code,
    unused
)]

//! Resumable, heartbeat-driven WebSocket client for a JSON gateway protocol.
//!
//! A [`Shard`] owns exactly one `(shard_index, shard_count)` partition of a
//! remote event stream. It negotiates a heartbeat interval, identifies or
//! resumes against a caller-supplied [`SessionStore`], multiplexes inbound
//! dispatch events against outbound control frames under a send ratelimit,
//! and reconnects on recoverable closes.
//!
//! This crate does not interpret dispatch payloads beyond the handful of
//! control events it needs (`READY`, `RESUMED`); everything else is handed,
//! still encoded, to the [`Config::on_packet`] callback.

pub mod close;
pub mod compression;
pub mod config;
pub mod error;
pub mod packet;
pub mod ratelimiter;
pub mod session;
pub mod shard;

mod connection;
mod metrics;
mod tls;

pub use self::{
    config::{Config, ConfigBuilder, ShardId},
    error::{ReceiveMessageError, SendError, ShardInitializeError},
    packet::{Opcode, ReceivePacket, SendPacket},
    session::SessionStore,
    shard::Shard,
};

/// Gateway protocol version this crate negotiates by default.
pub const API_VERSION: u32 = 10;

#[cfg(not(any(
    feature = "native",
    feature = "rustls-native-roots",
    feature = "rustls-webpki-roots"
)))]
compile_error!(
    "Either the `native`, `rustls-native-roots` or `rustls-webpki-roots` feature must be enabled."
);
