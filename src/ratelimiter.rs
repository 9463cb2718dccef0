//! Ratelimiters bounding outbound frames.
//!
//! Two independent buckets exist: one for identify frames, shared across
//! every shard that identifies through the same gateway bucket, and one
//! for all other outbound frames, private to a single [`Shard`].
//!
//! [`Shard`]: crate::Shard

use leaky_bucket_lite::LeakyBucket;
use std::time::{Duration, Instant};

/// Number of outbound frames allowed per reset period, excluding identify.
const SEND_LIMIT: u32 = 120;

/// Length of the send reset period.
const SEND_INTERVAL: Duration = Duration::from_secs(60);

/// Number of identify frames allowed per reset period.
const IDENTIFY_LIMIT: u32 = 1;

/// Length of the identify reset period.
const IDENTIFY_INTERVAL: Duration = Duration::from_secs(5);

/// Token-bucket ratelimiter guarding outbound frames.
#[derive(Debug)]
pub struct CommandRatelimiter {
    /// Bucket used for limiting actions.
    bucket: LeakyBucket,
}

impl CommandRatelimiter {
    /// Create a ratelimiter with an arbitrary bucket size and refill
    /// interval.
    ///
    /// Exposed for callers that want to share a bucket with a different
    /// cadence than the gateway defaults, such as a proxy in front of the
    /// real gateway that advertises its own limits.
    pub fn new(max: u32, interval: Duration) -> Self {
        let bucket = LeakyBucket::builder()
            .max(max)
            .tokens(max)
            .refill_interval(interval)
            .refill_amount(max)
            .build();

        Self { bucket }
    }

    /// Create the default ratelimiter used for non-identify outbound
    /// frames: 120 tokens per 60 second window.
    pub fn for_sending() -> Self {
        Self::new(SEND_LIMIT, SEND_INTERVAL)
    }

    /// Create the default ratelimiter used for identify frames: 1 token
    /// per 5 second window.
    pub fn for_identify() -> Self {
        Self::new(IDENTIFY_LIMIT, IDENTIFY_INTERVAL)
    }

    /// Current number of tokens still available within the interval.
    pub fn available(&self) -> u32 {
        self.bucket.tokens()
    }

    /// Maximum number of tokens allotted per interval.
    pub fn max(&self) -> u32 {
        self.bucket.max()
    }

    /// When the bucket will next refill.
    pub fn next_refill(&self) -> Instant {
        self.bucket.next_refill().into_std()
    }

    /// Acquire a single token, waiting until one becomes available.
    pub async fn acquire_one(&self) {
        self.bucket.acquire_one().await;
    }
}

#[cfg(test)]
mod tests {
    use super::CommandRatelimiter;
    use static_assertions::assert_impl_all;
    use std::{fmt::Debug, time::Duration};

    assert_impl_all!(CommandRatelimiter: Debug, Send, Sync);

    #[test]
    fn send_defaults() {
        let limiter = CommandRatelimiter::for_sending();

        assert_eq!(120, limiter.max());
        assert_eq!(120, limiter.available());
    }

    #[test]
    fn identify_defaults() {
        let limiter = CommandRatelimiter::for_identify();

        assert_eq!(1, limiter.max());
        assert_eq!(1, limiter.available());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_drains_and_refills() {
        let limiter = CommandRatelimiter::new(2, Duration::from_millis(100));

        limiter.acquire_one().await;
        limiter.acquire_one().await;
        assert_eq!(0, limiter.available());

        tokio::time::advance(Duration::from_millis(110)).await;
        limiter.acquire_one().await;
        assert_eq!(1, limiter.available());
    }
}
