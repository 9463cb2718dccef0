//! Customizable configuration for a [`Shard`].
//!
//! [`Shard`]: crate::Shard

use crate::{
    packet::Intents,
    ratelimiter::CommandRatelimiter,
    session::{InMemorySessionStore, SessionStore},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
};

/// Identifier of a [shard], including the shard's index and the total number
/// of shards in use by the fleet.
///
/// [shard]: crate::Shard
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShardId {
    /// Index of this shard, 0-indexed.
    index: u32,
    /// Total number of shards in use, 1-indexed.
    count: u32,
}

impl ShardId {
    /// ID of a bot that has only one shard.
    pub const ONE: ShardId = ShardId::new(0, 1);

    /// Create a new shard identifier.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count`, or if `count` is zero.
    pub const fn new(index: u32, count: u32) -> Self {
        assert!(count > 0, "shard count must be greater than zero");
        assert!(index < count, "shard index must be less than shard count");

        Self { index, count }
    }

    /// Index of this shard, 0-indexed.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Total number of shards in use, 1-indexed.
    pub const fn count(self) -> u32 {
        self.count
    }
}

impl Display for ShardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "shard {}/{}", self.index, self.count)
    }
}

/// Identifying properties sent as part of an `Identify` command.
///
/// Roughly analogous to a user agent.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IdentifyProperties {
    /// Operating system the shard is running on.
    pub os: String,
    /// Name of the library connecting to the gateway.
    pub browser: String,
    /// Name of the library connecting to the gateway.
    pub device: String,
}

impl IdentifyProperties {
    /// Create new identifying properties.
    pub fn new(os: impl Into<String>, browser: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            browser: browser.into(),
            device: device.into(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new(std::env::consts::OS, "twilight-gateway", "twilight-gateway")
    }
}

/// Configuration used by a [`Shard`] to identify with the gateway.
///
/// Use [`Config::builder`] to start configuring a shard.
///
/// [`Shard`]: crate::Shard
#[derive(Clone)]
pub struct Config {
    /// Token used to authenticate when identifying with the gateway.
    pub(crate) token: Box<str>,
    /// Intents requested when identifying.
    pub(crate) intents: Intents,
    /// Identifying properties.
    pub(crate) identify_properties: IdentifyProperties,
    /// Presence to set when identifying.
    pub(crate) presence: Option<serde_json::Value>,
    /// Protocol version used in the connection URL's `v` query parameter.
    pub(crate) version: u32,
    /// Base gateway URL to dial on a cold connect.
    pub(crate) gateway_url: Box<str>,
    /// Persistent session store.
    pub(crate) store: Arc<dyn SessionStore>,
    /// Ratelimiter bounding all outbound frames.
    pub(crate) send_limiter: Arc<CommandRatelimiter>,
    /// Ratelimiter bounding identify frames; may be shared across shards.
    pub(crate) identify_limiter: Arc<CommandRatelimiter>,
    /// Whether outgoing commands are ratelimited at all.
    pub(crate) ratelimit_messages: bool,
    /// Callback invoked for every decoded packet.
    pub(crate) on_packet: Option<Arc<dyn Fn(&crate::packet::ReceivePacket) + Send + Sync>>,
}

impl Config {
    /// Create a new default configuration for a shard.
    ///
    /// Shortcut for [`Config::builder`] followed by an immediate
    /// [`ConfigBuilder::build`].
    pub fn new(token: String, intents: Intents, gateway_url: impl Into<String>) -> Self {
        Self::builder(token, intents, gateway_url).build()
    }

    /// Create a builder to customize the configuration for a shard.
    pub fn builder(token: String, intents: Intents, gateway_url: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(token, intents, gateway_url)
    }

    /// Token used to authenticate when identifying with the gateway.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Intents requested when identifying with the gateway.
    pub const fn intents(&self) -> Intents {
        self.intents
    }

    /// Protocol version negotiated in the connection URL.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Base gateway URL used on a cold connect.
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Session store used to persist resume state.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}

/// Builder to customize the operation of a shard.
#[must_use = "builder must be completed to be used"]
pub struct ConfigBuilder {
    /// Inner configuration being assembled.
    inner: Config,
}

impl ConfigBuilder {
    /// Create a new builder to configure and construct a shard.
    ///
    /// Refer to each method to learn their default values.
    pub fn new(mut token: String, intents: Intents, gateway_url: impl Into<String>) -> Self {
        if !token.starts_with("Bot ") {
            token.insert_str(0, "Bot ");
        }

        Self {
            inner: Config {
                token: token.into_boxed_str(),
                intents,
                identify_properties: IdentifyProperties::default(),
                presence: None,
                version: crate::API_VERSION,
                gateway_url: gateway_url.into().into_boxed_str(),
                store: Arc::new(InMemorySessionStore::new()),
                send_limiter: Arc::new(CommandRatelimiter::for_sending()),
                identify_limiter: Arc::new(CommandRatelimiter::for_identify()),
                ratelimit_messages: true,
                on_packet: None,
            },
        }
    }

    /// Consume the builder, constructing a [`Config`].
    pub fn build(self) -> Config {
        self.inner
    }

    /// Set the identifying properties to use.
    pub fn identify_properties(mut self, properties: IdentifyProperties) -> Self {
        self.inner.identify_properties = properties;

        self
    }

    /// Set the initial presence to set when identifying.
    pub fn presence(mut self, presence: serde_json::Value) -> Self {
        self.inner.presence = Some(presence);

        self
    }

    /// Override the protocol version query parameter. Defaults to
    /// [`crate::API_VERSION`].
    pub const fn version(mut self, version: u32) -> Self {
        self.inner.version = version;

        self
    }

    /// Set the session store used to persist resume state.
    ///
    /// Defaults to an in-memory store, which loses the session across
    /// process restarts. Production deployments should supply a durable
    /// implementation.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.inner.store = store;

        self
    }

    /// Set the ratelimiter bounding all outbound frames.
    ///
    /// Defaults to a private `(120, 60s)` limiter.
    pub fn send_limiter(mut self, limiter: Arc<CommandRatelimiter>) -> Self {
        self.inner.send_limiter = limiter;

        self
    }

    /// Set the ratelimiter bounding identify frames.
    ///
    /// This may be shared across shards that identify against the same
    /// gateway bucket. Defaults to a private `(1, 5s)` limiter.
    pub fn identify_limiter(mut self, limiter: Arc<CommandRatelimiter>) -> Self {
        self.inner.identify_limiter = limiter;

        self
    }

    /// Set whether outgoing commands are ratelimited.
    ///
    /// Useful when running behind a proxy gateway that already ratelimits.
    /// Defaults to `true`.
    pub const fn ratelimit_messages(mut self, ratelimit_messages: bool) -> Self {
        self.inner.ratelimit_messages = ratelimit_messages;

        self
    }

    /// Set a callback invoked for every decoded packet.
    ///
    /// The callback is informational: its invocation never influences the
    /// shard's own state machine, and panics inside it are not caught.
    pub fn on_packet<F>(mut self, callback: F) -> Self
    where
        F: Fn(&crate::packet::ReceivePacket) + Send + Sync + 'static,
    {
        self.inner.on_packet = Some(Arc::new(callback));

        self
    }
}

#[cfg(test)]
mod tests {
    use super::ShardId;

    #[test]
    fn shard_id_display() {
        assert_eq!("shard 0/1", ShardId::ONE.to_string());
        assert_eq!("shard 2/4", ShardId::new(2, 4).to_string());
    }

    #[test]
    #[should_panic(expected = "shard index must be less than shard count")]
    fn shard_id_index_out_of_range() {
        ShardId::new(4, 4);
    }

    #[test]
    #[should_panic(expected = "shard count must be greater than zero")]
    fn shard_id_zero_count() {
        ShardId::new(0, 0);
    }
}
