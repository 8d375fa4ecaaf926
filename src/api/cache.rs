//
//  bkt-cli
//  api/cache.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Response Cache
//!
//! In-memory, size-bounded LRU of validated GET/HEAD responses, used to
//! revalidate with `If-None-Match` / `If-Modified-Since` and to materialise
//! `304 Not Modified` answers. Entries never touch disk and die with the
//! transport that owns them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Default number of entries kept per transport.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// `(method, absolute URL, auth identity)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
    identity: String,
}

impl CacheKey {
    /// Builds a key; `identity` should come from [`auth_identity`].
    pub fn new(method: &str, url: &str, identity: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            identity: identity.to_string(),
        }
    }
}

/// A stored response and its validators.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// `ETag` response header, verbatim.
    pub etag: Option<String>,
    /// `Last-Modified` response header, verbatim.
    pub last_modified: Option<String>,
    /// Full response body.
    pub body: Bytes,
    /// Status of the original response.
    pub status: u16,
    /// When the response was stored.
    pub received_at: DateTime<Utc>,
}

/// Opaque identity for a credential: a SHA-256 prefix, never the secret itself.
pub fn auth_identity(username: Option<&str>, secret: Option<&str>) -> String {
    match (username, secret) {
        (None, None) => "anonymous".to_string(),
        (user, secret) => {
            let mut hasher = Sha256::new();
            hasher.update(user.unwrap_or_default().as_bytes());
            hasher.update(b":");
            hasher.update(secret.unwrap_or_default().as_bytes());
            let digest = format!("{:x}", hasher.finalize());
            digest[..16].to_string()
        }
    }
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<CacheKey, (CacheEntry, u64)>,
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.tick += 1;
        let tick = self.tick;
        let (entry, stamp) = self.entries.get_mut(key)?;
        self.recency.remove(stamp);
        *stamp = tick;
        self.recency.insert(tick, key.clone());
        Some(entry.clone())
    }
}

/// Bounded LRU map from [`CacheKey`] to [`CacheEntry`].
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    state: Mutex<LruState>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    /// A cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Looks up an entry and marks it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.lock().touch(key)
    }

    /// Inserts or replaces an entry, evicting the least recently used one if full.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        let mut state = self.lock();
        state.tick += 1;
        let tick = state.tick;

        if let Some((_, old)) = state.entries.remove(&key) {
            state.recency.remove(&old);
        }

        while state.entries.len() >= self.capacity {
            let Some((_, oldest)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&oldest);
        }

        state.recency.insert(tick, key.clone());
        state.entries.insert(key, (entry, tick));
    }

    /// Drops an entry, if present.
    pub fn remove(&self, key: &CacheKey) {
        let mut state = self.lock();
        if let Some((_, stamp)) = state.entries.remove(key) {
            state.recency.remove(&stamp);
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
