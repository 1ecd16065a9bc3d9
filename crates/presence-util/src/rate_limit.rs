//! Per-client request throttling for the IPC command path

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Token-bucket rate limiter keyed by client
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    refill_every: Duration,
    buckets: HashMap<ClientId, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    refilled_at: Instant,
}

impl Bucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: capacity,
            refilled_at: now,
        }
    }

    fn refill(&mut self, capacity: u32, refill_every: Duration, now: Instant) {
        let elapsed = now.duration_since(self.refilled_at);
        if elapsed < refill_every {
            return;
        }
        let periods = (elapsed.as_millis() / refill_every.as_millis().max(1)) as u32;
        self.tokens = self
            .tokens
            .saturating_add(periods.saturating_mul(capacity))
            .min(capacity);
        self.refilled_at = now;
    }
}

impl RateLimiter {
    /// Allow `max_requests` per `interval` for each client
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            capacity: max_requests,
            refill_every: interval,
            buckets: HashMap::new(),
        }
    }

    /// Returns `true` if the request is allowed, consuming one token
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        let now = Instant::now();
        let capacity = self.capacity;
        let refill_every = self.refill_every;

        let bucket = self
            .buckets
            .entry(client_id.clone())
            .or_insert_with(|| Bucket::full(capacity, now));
        bucket.refill(capacity, refill_every, now);

        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }

    /// Forget a disconnected client
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.buckets.remove(client_id);
    }

    /// Drop buckets that have not been touched for `stale_after`
    pub fn cleanup(&mut self, stale_after: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.refilled_at) < stale_after);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));
        let client = ClientId::new();

        assert!(limiter.check(&client));
        assert!(limiter.check(&client));
        assert!(limiter.check(&client));
        assert!(!limiter.check(&client));
    }

    #[test]
    fn clients_have_separate_buckets() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(1));
        let a = ClientId::new();
        let b = ClientId::new();

        assert!(limiter.check(&a));
        assert!(!limiter.check(&a));
        assert!(limiter.check(&b));
    }

    #[test]
    fn refills_after_interval() {
        let mut limiter = RateLimiter::new(1, Duration::from_millis(20));
        let client = ClientId::new();

        assert!(limiter.check(&client));
        assert!(!limiter.check(&client));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(&client));
    }

    #[test]
    fn remove_and_cleanup() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(1));
        let a = ClientId::new();
        let b = ClientId::new();
        limiter.check(&a);
        limiter.check(&b);
        assert_eq!(limiter.tracked_clients(), 2);

        limiter.remove_client(&a);
        assert_eq!(limiter.tracked_clients(), 1);

        limiter.cleanup(Duration::ZERO);
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
