// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for per-user credential listings.
//!
//! Listings are the hottest read (every dashboard load) and change only when
//! a credential is issued, anchored or revoked, so entries are invalidated on
//! those writes and otherwise live for the TTL.
//!
//! Every invalidation bumps a generation counter. A fetch that started before
//! an invalidation may have read the old rows, so its result is returned to
//! the caller but not cached.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::records::CredentialRecord;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct CacheEntry {
    credentials: Vec<CredentialRecord>,
    inserted_at: Instant,
}

pub struct CredentialCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    generation: AtomicU64,
    ttl: Duration,
}

/// Cache key for everything a user issued or received.
pub fn listing_key(user_id: &str) -> String {
    format!("credentials:{user_id}")
}

impl CredentialCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, key: &str) -> Option<Vec<CredentialRecord>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.credentials.clone());
            }
            // Expired
            cache.pop(key);
        }
        None
    }

    pub fn put(&self, key: &str, credentials: Vec<CredentialRecord>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key.to_string(),
                CacheEntry {
                    credentials,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Serve from cache, or run `fetch` and cache its result. Errors are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        fetch: impl FnOnce() -> Result<Vec<CredentialRecord>, E>,
    ) -> Result<Vec<CredentialRecord>, E> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let started = self.generation.load(Ordering::SeqCst);
        let fresh = fetch()?;

        if let Ok(mut cache) = self.cache.lock() {
            // Checked under the lock so no invalidation lands between check and put.
            if self.generation.load(Ordering::SeqCst) == started {
                cache.put(
                    key.to_string(),
                    CacheEntry {
                        credentials: fresh.clone(),
                        inserted_at: Instant::now(),
                    },
                );
            }
        }
        Ok(fresh)
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            cache.pop(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialFields;
    use chrono::Utc;

    fn sample() -> Vec<CredentialRecord> {
        let fields = CredentialFields::new("inst", "stu", "BSc Physics", "", Utc::now());
        let hash = fields.content_hash().unwrap();
        vec![CredentialRecord::new_created("c1", &fields, hash, "urn:credential:c1")]
    }

    #[test]
    fn cache_put_and_get() {
        let cache = CredentialCache::new(10, DEFAULT_CACHE_TTL);
        let key = listing_key("stu");
        assert!(cache.get(&key).is_none());

        cache.put(&key, sample());
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "c1");
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = CredentialCache::new(10, Duration::from_millis(1));
        cache.put("k", sample());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn fetcher_runs_once_until_invalidated() {
        let cache = CredentialCache::new(10, DEFAULT_CACHE_TTL);
        let mut calls = 0;

        for _ in 0..3 {
            let result: Result<_, ()> = cache.get_or_try_insert_with("k", || {
                calls += 1;
                Ok(sample())
            });
            assert_eq!(result.unwrap().len(), 1);
        }
        assert_eq!(calls, 1);

        cache.invalidate("k");
        let _ = cache.get_or_try_insert_with("k", || -> Result<_, ()> {
            calls += 1;
            Ok(sample())
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let cache = CredentialCache::new(10, DEFAULT_CACHE_TTL);
        let result = cache.get_or_try_insert_with("k", || Err("store down"));
        assert_eq!(result, Err("store down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn fetch_overtaken_by_a_write_is_not_cached() {
        let cache = CredentialCache::new(10, DEFAULT_CACHE_TTL);
        let key = listing_key("stu");

        // A write lands while the listing is being read.
        let stale: Result<_, ()> = cache.get_or_try_insert_with(&key, || {
            cache.invalidate(&key);
            Ok(Vec::new())
        });
        assert!(stale.unwrap().is_empty());
        assert!(cache.get(&key).is_none());

        let fresh: Result<_, ()> = cache.get_or_try_insert_with(&key, || Ok(sample()));
        assert_eq!(fresh.unwrap().len(), 1);
        assert_eq!(cache.get(&key).map(|hit| hit.len()), Some(1));
    }

    #[test]
    fn clear_drops_everything() {
        let cache = CredentialCache::new(10, DEFAULT_CACHE_TTL);
        cache.put(&listing_key("a"), sample());
        cache.put(&listing_key("b"), sample());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
