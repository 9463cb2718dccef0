//! Thin wrappers around the `metrics` facade, active only when the
//! `metrics` feature is enabled.
//!
//! Kept as free functions rather than scattering `#[cfg(feature = "metrics")]`
//! calls through [`crate::shard`] directly.

use crate::config::ShardId;

/// Record that a shard transitioned to or from the alive state.
pub(crate) fn shards_alive(shard: ShardId, alive: bool) {
    #[cfg(feature = "metrics")]
    metrics::gauge!("shards_alive", if alive { 1.0 } else { 0.0 }, "shard" => shard.to_string());
    #[cfg(not(feature = "metrics"))]
    let _ = (shard, alive);
}

/// Record an inbound dispatch or control envelope.
pub(crate) fn packet_received(shard: ShardId, op: crate::packet::Opcode, event: Option<&str>) {
    #[cfg(feature = "metrics")]
    metrics::counter!(
        "packets_received", 1,
        "shard" => shard.to_string(),
        "op" => format!("{op:?}"),
        "event" => event.unwrap_or("none").to_owned(),
    );
    #[cfg(not(feature = "metrics"))]
    let _ = (shard, op, event);
}

/// Record an outbound envelope.
pub(crate) fn packet_sent(shard: ShardId, op: crate::packet::Opcode) {
    #[cfg(feature = "metrics")]
    metrics::counter!("packets_sent", 1, "shard" => shard.to_string(), "op" => format!("{op:?}"));
    #[cfg(not(feature = "metrics"))]
    let _ = (shard, op);
}

/// Record a heartbeat round-trip time.
pub(crate) fn ping(shard: ShardId, millis: f64) {
    #[cfg(feature = "metrics")]
    metrics::histogram!("ping_ms", millis, "shard" => shard.to_string());
    #[cfg(not(feature = "metrics"))]
    let _ = (shard, millis);
}
