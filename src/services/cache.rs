// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through cache for rides and trip lists.
//!
//! Entries carry the time they were fetched. Anything older than the
//! freshness window is treated as a miss and overwritten by the next fetch.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::models::Ride;
use crate::services::trips::Trip;

/// A cached value with its fetch time.
#[derive(Clone)]
struct CachedEntry<T> {
    value: T,
    fetched_at: DateTime<Utc>,
}

/// String-keyed cache with a fixed freshness window.
pub struct TtlCache<T> {
    entries: DashMap<String, CachedEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Return the entry if it was fetched within the window.
    ///
    /// Stale entries are dropped on read.
    pub fn get_fresh(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let fresh = {
            let entry = self.entries.get(key)?;
            if now.signed_duration_since(entry.fetched_at) < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        };

        if fresh.is_none() {
            tracing::debug!(key, "Cache entry stale, dropping");
            self.entries.remove(key);
        }
        fresh
    }

    pub fn put(&self, key: &str, value: T, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                fetched_at: now,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Serve a fresh entry, or run `fetch` and overwrite the entry with its result.
    ///
    /// Fetch errors are returned and nothing is cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, now: DateTime<Utc>, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get_fresh(key, now) {
            tracing::debug!(key, "Cache hit");
            return Ok(value);
        }

        let value = fetch().await?;
        self.put(key, value.clone(), now);
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for a ride document.
pub fn ride_key(ride_id: &str) -> String {
    format!("ride:{}", ride_id)
}

/// Cache key for a user's trip list.
pub fn trips_key(user_id: &str) -> String {
    format!("trips:{}", user_id)
}

/// Shared ride and trip-list caches.
#[derive(Clone)]
pub struct RideCache {
    rides: Arc<TtlCache<Ride>>,
    trips: Arc<TtlCache<Vec<Trip>>>,
}

impl RideCache {
    pub fn new(ttl_secs: i64) -> Self {
        let ttl = Duration::seconds(ttl_secs);
        Self {
            rides: Arc::new(TtlCache::new(ttl)),
            trips: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub fn rides(&self) -> &TtlCache<Ride> {
        &self.rides
    }

    pub fn trips(&self) -> &TtlCache<Vec<Trip>> {
        &self.trips
    }

    /// Drop everything a mutation of `ride_id` could have made stale.
    pub fn invalidate_ride(&self, ride_id: &str, user_ids: &[&str]) {
        self.rides.invalidate(&ride_key(ride_id));
        for user_id in user_ids {
            self.trips.invalidate(&trips_key(user_id));
        }
    }
}
