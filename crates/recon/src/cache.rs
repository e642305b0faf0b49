//! Explicit memoization of match results.
//!
//! A cached match vector is keyed by fingerprints of exactly what it was
//! computed from: the normalized listing codes (in order), the canonical
//! reference codes, and the scorer settings. Any change to an input yields a
//! different key, so a stale entry is never returned. Entries can also be
//! dropped explicitly per dataset.

use std::collections::VecDeque;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Match, ReferenceSet};
use crate::similarity::Scorer;

pub const DEFAULT_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// BLAKE3 over length-prefixed parts, so `["ab", "c"]` and `["a", "bc"]`
/// hash differently.
fn fingerprint_parts<'a>(tag: &str, parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Hasher::new();
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub fn listings_fingerprint(codes: &[String]) -> String {
    fingerprint_parts("listings", codes.iter().map(|c| c.as_str()))
}

pub fn reference_fingerprint(reference: &ReferenceSet) -> String {
    fingerprint_parts("reference", reference.records.keys().map(|c| c.as_str()))
}

pub fn settings_fingerprint(scorer: Scorer, threshold: f64) -> String {
    let scorer = scorer.to_string();
    let threshold = threshold.to_bits().to_string();
    fingerprint_parts("settings", [scorer.as_str(), threshold.as_str()])
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub listings: String,
    pub reference: String,
    pub settings: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    matches: Vec<Option<Match>>,
}

/// Bounded, insertion-ordered cache. The oldest entry is evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCache {
    capacity: usize,
    entries: VecDeque<CacheEntry>,
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MatchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<&[Option<Match>]> {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.matches.as_slice())
    }

    pub fn insert(&mut self, key: CacheKey, matches: Vec<Option<Match>>) {
        self.entries.retain(|e| e.key != key);
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(CacheEntry { key, matches });
    }

    /// Drop every entry computed from this listings fingerprint.
    pub fn invalidate_listings(&mut self, fingerprint: &str) -> usize {
        self.remove_where(|k| k.listings == fingerprint)
    }

    /// Drop every entry computed against this reference fingerprint.
    pub fn invalidate_reference(&mut self, fingerprint: &str) -> usize {
        self.remove_where(|k| k.reference == fingerprint)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn remove_where(&mut self, pred: impl Fn(&CacheKey) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !pred(&e.key));
        before - self.entries.len()
    }

    pub fn to_json(&self) -> Result<String, ReconError> {
        serde_json::to_string(self).map_err(|e| ReconError::Cache(e.to_string()))
    }

    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let mut cache: MatchCache =
            serde_json::from_str(input).map_err(|e| ReconError::Cache(e.to_string()))?;
        cache.capacity = cache.capacity.max(1);
        while cache.entries.len() > cache.capacity {
            cache.entries.pop_front();
        }
        Ok(cache)
    }
}
