//! Bounded memoization of classification results.
//!
//! Repeated identical submissions (same exact selfie and reference bytes)
//! return the previously computed suggestion without a new network call.
//! Unlike a process-wide unbounded cache, this one has an explicit capacity
//! with least-recently-used eviction, so long-running hosts don't leak.
//! Keys are SHA-256 digests of the exact input bytes, never the bytes
//! themselves.

use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};

use crate::schema::ToneSuggestion;

/// Default capacity — plenty for a single interactive session.
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Digest of one (selfie, optional reference) input pair.
pub type CacheKey = [u8; 32];

/// Compute the cache key for a submission.
///
/// The selfie length and a reference-presence marker are folded in so that
/// concatenation ambiguity cannot alias two different submissions.
pub fn cache_key(selfie: &[u8], reference: Option<&[u8]>) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((selfie.len() as u64).to_le_bytes());
    hasher.update(selfie);
    match reference {
        Some(bytes) => {
            hasher.update([1u8]);
            hasher.update(bytes);
        }
        None => hasher.update([0u8]),
    }
    hasher.finalize().into()
}

/// Size-bounded LRU cache of suggestions.
///
/// A capacity of zero disables caching entirely.
pub struct SuggestionCache {
    capacity: usize,
    entries: HashMap<CacheKey, ToneSuggestion>,
    /// Recency order, least-recent first.
    order: VecDeque<CacheKey>,
}

impl SuggestionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Look up a suggestion, promoting the key to most-recently-used.
    pub fn get(&mut self, key: &CacheKey) -> Option<ToneSuggestion> {
        let hit = self.entries.get(key).cloned()?;
        self.promote(key);
        Some(hit)
    }

    /// Insert a suggestion, evicting the least-recently-used entry at
    /// capacity. Replacing an existing key also promotes it.
    pub fn insert(&mut self, key: CacheKey, suggestion: ToneSuggestion) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.insert(key, suggestion).is_some() {
            self.promote(&key);
            return;
        }

        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn promote(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(*key);
        }
    }
}
