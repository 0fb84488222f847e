use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::{debug, instrument, warn};

/// Per-address budget of new sessions, refilled in whole intervals.
#[derive(Debug)]
pub struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
    capacity: u32,
    refill_interval: Duration,
}

impl TokenBucket {
    fn new(capacity: u32, refill_interval: Duration) -> Self {
        debug!(
            "Creating new token bucket: capacity={}, interval={}s",
            capacity,
            refill_interval.as_secs()
        );
        Self {
            last_refill: Instant::now(),
            tokens: capacity,
            capacity,
            refill_interval,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            debug!("Token consumed, remaining: {}", self.tokens);
            true
        } else {
            debug!("No tokens available for consumption");
            false
        }
    }

    /// True once a refill would restore the full capacity.
    fn is_idle(&self) -> bool {
        self.last_refill.elapsed() >= self.refill_interval
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        if elapsed >= self.refill_interval {
            if self.tokens != self.capacity {
                debug!(
                    "Token bucket refilled: {} -> {} tokens",
                    self.tokens, self.capacity
                );
            }
            self.tokens = self.capacity;
            self.last_refill = Instant::now();
        }
    }
}

pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    /// Allows `per_minute` new sessions per address each minute.
    pub fn per_minute(per_minute: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: per_minute,
            refill_interval: Duration::from_secs(60),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn check(&self, ip: &IpAddr) -> Result<(), Status> {
        let mut entry = self
            .buckets
            .entry(*ip)
            .or_insert_with(|| TokenBucket::new(self.capacity, self.refill_interval));

        if entry.try_consume() {
            debug!("Rate limit check passed for {}", ip);
            Ok(())
        } else {
            warn!("Rate limit exceeded for {} - rejecting request", ip);
            Err(Status::TooManyRequests)
        }
    }

    /// Forgets addresses whose bucket would be full again on their next
    /// request. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_idle());
        let pruned = before.saturating_sub(self.buckets.len());
        if pruned > 0 {
            debug!("Pruned {} idle rate limit buckets", pruned);
        }
        pruned
    }

    pub fn tracked_addresses(&self) -> usize {
        self.buckets.len()
    }
}

/// Caller address, honoring the usual reverse proxy headers.
pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|header| header.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        request::Outcome::Success(ClientIp(ip))
    }
}
