//! # Idempotency store
//!
//! Remembers which webhook deliveries were already processed so a provider retry
//! is acknowledged without running side effects twice.
//!
//! Records live in Redis when a URL is configured (shared by every instance and
//! surviving restarts). Without Redis, or whenever a Redis call fails, a bounded
//! in-process TTL cache is used instead.
//!
//! ```rust
//! use qpay_cache::{EventResult, IdempotencyStore};
//! use qpay_domain::payments::Provider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = IdempotencyStore::builder().build().await;
//! assert!(!store.is_processed(Provider::Stripe, "evt_1").await);
//!
//! store.mark_processed(Provider::Stripe, "evt_1", EventResult::Handled).await;
//! assert!(store.is_processed(Provider::Stripe, "evt_1").await);
//! # }
//! ```

mod error;

pub use crate::error::CacheError;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use qpay_domain::constants::{CLAIM_KEY_PREFIX, EVENT_KEY_PREFIX};
use qpay_domain::payments::Provider;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_TTL: Duration = Duration::from_secs(86_400);
/// Longest a delivery may hold its claim; a crashed worker's claim expires after this.
const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CAPACITY: u64 = 100_000;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome recorded for a processed delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventResult {
    /// A subscription was activated.
    Success { user_id: Uuid, plan: String },
    /// The event changed state or produced an audit record.
    Handled,
    /// The event type is not acted upon.
    Ignored,
    /// Processing failed. The delivery stays eligible for a retry.
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub processed_at: DateTime<Utc>,
    pub result: EventResult,
}

impl ProcessedEvent {
    /// Whether a redelivery of this event should be skipped.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        !matches!(self.result, EventResult::Failed { .. })
    }
}

/// Builds the cache key for a provider event.
#[must_use]
pub fn event_key(provider: Provider, event_id: &str) -> String {
    format!("{EVENT_KEY_PREFIX}:{provider}:{event_id}")
}

/// Builds the claim key held while an event is being processed.
#[must_use]
pub fn claim_key(provider: Provider, event_id: &str) -> String {
    format!("{CLAIM_KEY_PREFIX}:{provider}:{event_id}")
}

#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug)]
pub struct IdempotencyStoreBuilder {
    redis_url: Option<String>,
    ttl: Duration,
    claim_ttl: Duration,
    capacity: u64,
}

impl Default for IdempotencyStoreBuilder {
    fn default() -> Self {
        Self { redis_url: None, ttl: DEFAULT_TTL, claim_ttl: DEFAULT_CLAIM_TTL, capacity: DEFAULT_CAPACITY }
    }
}

impl IdempotencyStoreBuilder {
    /// Empty URLs are treated as unset.
    pub fn redis_url(mut self, url: Option<String>) -> Self {
        self.redis_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub const fn claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub const fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Connects to Redis when configured.
    ///
    /// An invalid or unreachable Redis URL is logged and the store runs in memory only.
    pub async fn build(self) -> IdempotencyStore {
        let redis = match self.redis_url.as_deref() {
            Some(url) => connect(url).await,
            None => None,
        };

        info!(
            backend = if redis.is_some() { "redis" } else { "memory" },
            ttl_secs = self.ttl.as_secs(),
            "Idempotency store ready"
        );

        IdempotencyStore {
            redis,
            memory: Cache::builder().max_capacity(self.capacity).time_to_live(self.ttl).build(),
            claims: Cache::builder().max_capacity(self.capacity).time_to_live(self.claim_ttl).build(),
            ttl: self.ttl,
            claim_ttl: self.claim_ttl,
        }
    }
}

async fn connect(url: &str) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Invalid Redis URL, falling back to in-memory idempotency");
            return None;
        },
    };

    match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client)).await {
        Ok(Ok(manager)) => Some(manager),
        Ok(Err(e)) => {
            warn!(error = %e, "Redis connection failed, falling back to in-memory idempotency");
            None
        },
        Err(_) => {
            warn!("Redis connection timed out, falling back to in-memory idempotency");
            None
        },
    }
}

/// Shared handle; clones use the same connection and cache.
#[derive(Clone)]
pub struct IdempotencyStore {
    redis: Option<ConnectionManager>,
    memory: Cache<String, ProcessedEvent>,
    claims: Cache<String, ()>,
    ttl: Duration,
    claim_ttl: Duration,
}

impl fmt::Debug for IdempotencyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdempotencyStore")
            .field("backend", &self.backend())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl IdempotencyStore {
    pub fn builder() -> IdempotencyStoreBuilder {
        IdempotencyStoreBuilder::default()
    }

    #[must_use]
    pub const fn backend(&self) -> &'static str {
        if self.redis.is_some() { "redis" } else { "memory" }
    }

    /// Returns the stored record for an event, if any.
    pub async fn lookup(&self, provider: Provider, event_id: &str) -> Option<ProcessedEvent> {
        let key = event_key(provider, event_id);

        if let Some(manager) = &self.redis {
            match redis_get(manager.clone(), &key).await {
                Ok(found) => return found,
                Err(e) => warn!(error = %e, key = %key, "Redis lookup failed, using in-memory record"),
            }
        }

        self.memory.get(&key).await
    }

    /// True when the event was processed and must not run again.
    pub async fn is_processed(&self, provider: Provider, event_id: &str) -> bool {
        self.lookup(provider, event_id).await.is_some_and(|record| record.is_final())
    }

    /// Claims an event for processing. Exactly one of several concurrent
    /// callers gets `true`; the others must not run side effects.
    ///
    /// The claim lasts until [`IdempotencyStore::release`] or the claim TTL.
    /// With Redis it is a `SET NX EX`, so it holds across instances.
    pub async fn claim(&self, provider: Provider, event_id: &str) -> bool {
        let key = claim_key(provider, event_id);

        if let Some(manager) = &self.redis {
            match redis_claim(manager.clone(), &key, self.claim_ttl).await {
                Ok(claimed) => return claimed,
                Err(e) => warn!(error = %e, key = %key, "Redis claim failed, claiming in memory"),
            }
        }

        self.claims.entry(key).or_insert(()).await.is_fresh()
    }

    /// Gives up a claim taken with [`IdempotencyStore::claim`].
    pub async fn release(&self, provider: Provider, event_id: &str) {
        let key = claim_key(provider, event_id);

        if let Some(manager) = &self.redis
            && let Err(e) = redis_release(manager.clone(), &key).await
        {
            warn!(error = %e, key = %key, "Redis release failed, claim expires with its TTL");
        }

        self.claims.invalidate(&key).await;
    }

    /// Records the outcome of processing an event for the configured TTL.
    pub async fn mark_processed(
        &self,
        provider: Provider,
        event_id: &str,
        result: EventResult,
    ) -> ProcessedEvent {
        let key = event_key(provider, event_id);
        let record =
            ProcessedEvent { event_id: event_id.to_owned(), processed_at: Utc::now(), result };

        if let Some(manager) = &self.redis
            && let Err(e) = redis_set(manager.clone(), &key, &record, self.ttl).await
        {
            warn!(error = %e, key = %key, "Redis write failed, record kept in memory only");
        }

        self.memory.insert(key, record.clone()).await;
        record
    }
}

async fn redis_get(
    mut con: ConnectionManager,
    key: &str,
) -> Result<Option<ProcessedEvent>, CacheError> {
    let raw: Option<String> = con.get(key).await?;
    raw.map(|json| serde_json::from_str(&json)).transpose().map_err(CacheError::from)
}

async fn redis_set(
    mut con: ConnectionManager,
    key: &str,
    record: &ProcessedEvent,
    ttl: Duration,
) -> Result<(), CacheError> {
    let json = serde_json::to_string(record)?;
    let (): () = con.set_ex(key, json, ttl.as_secs().max(1)).await?;
    Ok(())
}

async fn redis_claim(mut con: ConnectionManager, key: &str, ttl: Duration) -> Result<bool, CacheError> {
    let reply: Option<String> = redis::cmd("SET")
        .arg(key)
        .arg(1)
        .arg("NX")
        .arg("EX")
        .arg(ttl.as_secs().max(1))
        .query_async(&mut con)
        .await?;
    Ok(reply.is_some())
}

async fn redis_release(mut con: ConnectionManager, key: &str) -> Result<(), CacheError> {
    let (): () = con.del(key).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_provider() {
        assert_eq!(event_key(Provider::Stripe, "evt_1"), "event:stripe:evt_1");
        assert_eq!(event_key(Provider::PayPal, "WH-1"), "event:paypal:WH-1");
        assert_eq!(claim_key(Provider::Stripe, "evt_1"), "claim:stripe:evt_1");
    }

    #[test]
    fn failed_results_are_not_final() {
        let failed = ProcessedEvent {
            event_id: "evt".to_owned(),
            processed_at: Utc::now(),
            result: EventResult::Failed { error: "boom".to_owned() },
        };
        assert!(!failed.is_final());

        let ignored = ProcessedEvent { result: EventResult::Ignored, ..failed };
        assert!(ignored.is_final());
    }

    #[test]
    fn results_serialize_with_outcome_tag() {
        let json = serde_json::to_value(EventResult::Failed { error: "x".to_owned() }).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "x");
    }
}
