// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL + capacity bounded cache of query embeddings.
//!
//! Entries are keyed by a fast non-cryptographic hash of the input text and
//! expire a fixed time after insertion. When full, expired entries are purged
//! first; if that frees nothing, the oldest-inserted entry is evicted. Reads
//! do not refresh an entry's position.
//!
//! The cache is advisory: a miss is always resolved by calling the encoder.
//! Each entry also keeps its text, so two texts that share a hash read as a
//! miss instead of returning the other text's vector.

use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lorekeeper_config::model::MemoryConfig;
use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::debug;

fn text_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    text: String,
    embedding: Vec<f32>,
    expires_at: Instant,
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<u64, CacheEntry>,
    /// Insertion order as (key, seq). Pairs whose seq no longer matches the
    /// live entry are stale and skipped.
    order: VecDeque<(u64, u64)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl CacheState {
    fn is_live(&self, key: u64, seq: u64) -> bool {
        self.entries.get(&key).is_some_and(|e| e.seq == seq)
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        let purged = before - self.entries.len();
        if purged > 0 {
            self.compact();
            self.expirations += purged as u64;
        }
        purged
    }

    fn evict_oldest(&mut self) {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.is_live(key, seq) {
                self.entries.remove(&key);
                self.evictions += 1;
                return;
            }
        }
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(key, seq)| entries.get(key).is_some_and(|e| e.seq == *seq));
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Process-local embedding cache. Construct one per pipeline and share it via `Arc`.
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    capacity: usize,
}

impl EmbeddingCache {
    /// A cache holding at most `capacity` entries (minimum 1) for `ttl` each.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_capacity,
        )
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still safe to use.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a live embedding for `text`. Expired entries are dropped here.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = text_key(text);
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired = match state.entries.get(&key) {
            Some(entry) if entry.expires_at <= now => true,
            Some(entry) if entry.text == text => {
                let embedding = entry.embedding.clone();
                state.hits += 1;
                counter!("lorekeeper_embedding_cache_hits_total").increment(1);
                return Some(embedding);
            }
            _ => false,
        };

        if expired {
            state.entries.remove(&key);
            state.expirations += 1;
            counter!("lorekeeper_embedding_cache_expirations_total").increment(1);
        }
        state.misses += 1;
        counter!("lorekeeper_embedding_cache_misses_total").increment(1);
        None
    }

    /// Insert or replace the embedding for `text`, restarting its TTL.
    pub fn put(&self, text: &str, embedding: Vec<f32>) {
        let key = text_key(text);
        let now = Instant::now();
        let mut state = self.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let purged = state.purge_expired(now);
            if purged > 0 {
                counter!("lorekeeper_embedding_cache_expirations_total").increment(purged as u64);
            }
            if state.entries.len() >= self.capacity {
                state.evict_oldest();
                counter!("lorekeeper_embedding_cache_evictions_total").increment(1);
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                text: text.to_string(),
                embedding,
                expires_at: now + self.ttl,
                seq,
            },
        );
        state.order.push_back((key, seq));

        // Replacing an existing key leaves a stale pair behind.
        if state.order.len() > self.capacity * 2 {
            state.compact();
        }
        gauge!("lorekeeper_embedding_cache_entries").set(state.entries.len() as f64);
    }

    /// Drop every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let purged = self.lock().purge_expired(Instant::now());
        if purged > 0 {
            debug!(purged, "purged expired embeddings");
            counter!("lorekeeper_embedding_cache_expirations_total").increment(purged as u64);
        }
        purged
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
        gauge!("lorekeeper_embedding_cache_entries").set(0.0);
    }

    /// Number of stored entries, including any not yet purged after expiry.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);
    const EPS: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn entry_lives_until_ttl() {
        let cache = EmbeddingCache::new(TTL, 10);
        cache.put("hello", vec![1.0, 0.0]);

        tokio::time::advance(TTL - EPS).await;
        assert_eq!(cache.get("hello"), Some(vec![1.0, 0.0]));

        tokio::time::advance(EPS * 2).await;
        assert_eq!(cache.get("hello"), None);
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_do_not_extend_ttl() {
        let cache = EmbeddingCache::new(TTL, 10);
        cache.put("a", vec![1.0]);
        tokio::time::advance(TTL / 2).await;
        assert!(cache.get("a").is_some());
        tokio::time::advance(TTL / 2 + EPS).await;
        assert!(cache.get("a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_restarts_ttl() {
        let cache = EmbeddingCache::new(TTL, 10);
        cache.put("a", vec![1.0]);
        tokio::time::advance(TTL - EPS).await;
        cache.put("a", vec![2.0]);
        tokio::time::advance(TTL - EPS).await;
        assert_eq!(cache.get("a"), Some(vec![2.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest_inserted() {
        let cache = EmbeddingCache::new(TTL, 3);
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            cache.put(text, vec![i as f32]);
        }
        // Reading "a" does not protect it.
        assert!(cache.get("a").is_some());
        cache.put("d", vec![3.0]);

        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn replaced_entry_counts_as_newest() {
        let cache = EmbeddingCache::new(TTL, 2);
        cache.put("a", vec![0.0]);
        cache.put("b", vec![1.0]);
        cache.put("a", vec![2.0]);
        cache.put("c", vec![3.0]);

        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a"), Some(vec![2.0]));
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn capacity_plus_one_keeps_capacity() {
        let cache = EmbeddingCache::new(TTL, 500);
        for i in 0..501 {
            cache.put(&format!("text {i}"), vec![i as f32]);
        }
        assert_eq!(cache.len(), 500);
        assert!(cache.get("text 0").is_none());
        assert!(cache.get("text 1").is_some());
        assert!(cache.get("text 500").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_purges_expired_before_evicting() {
        let cache = EmbeddingCache::new(TTL, 3);
        cache.put("old", vec![0.0]);
        tokio::time::advance(TTL / 2).await;
        cache.put("b", vec![1.0]);
        cache.put("c", vec![2.0]);
        tokio::time::advance(TTL / 2 + EPS).await;

        cache.put("d", vec![3.0]);
        let stats = cache.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
        assert!(cache.get("b").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_clear() {
        let cache = EmbeddingCache::new(TTL, 10);
        cache.put("a", vec![0.0]);
        tokio::time::advance(TTL).await;
        cache.put("b", vec![1.0]);

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn from_config_uses_defaults() {
        let cache = EmbeddingCache::default();
        assert_eq!(cache.ttl(), Duration::from_secs(300));
        assert_eq!(cache.capacity(), 500);
    }
}
