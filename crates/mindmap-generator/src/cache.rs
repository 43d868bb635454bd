//! In-memory result cache keyed by SHA-256 of (language, title, input)

use std::collections::{HashMap, VecDeque};

use mindmap_core::OutlineNode;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::language::Language;

/// Bounded cache; when full, the oldest entry is evicted first
pub struct GenerationCache {
    capacity: usize,
    inner: RwLock<Entries>,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, OutlineNode>,
    order: VecDeque<String>,
}

impl GenerationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(Entries::default()),
        }
    }

    /// The title is part of the key: it can become the root label
    pub fn key(language: Language, title: &str, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(language.code().as_bytes());
        hasher.update([0u8]);
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<OutlineNode> {
        self.inner.read().await.map.get(key).cloned()
    }

    pub async fn insert(&self, key: String, value: OutlineNode) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.inner.write().await;
        if entries.map.insert(key.clone(), value).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_evicts_oldest_first() {
        let cache = GenerationCache::new(2);
        for label in ["a", "b", "c"] {
            cache
                .insert(GenerationCache::key(Language::En, "t", label), OutlineNode::new(label))
                .await;
        }

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&GenerationCache::key(Language::En, "t", "a")).await.is_none());
        assert_eq!(
            cache.get(&GenerationCache::key(Language::En, "t", "c")).await.unwrap().label,
            "c"
        );
    }

    #[test]
    fn test_key_depends_on_language() {
        assert_ne!(
            GenerationCache::key(Language::En, "t", "x"),
            GenerationCache::key(Language::Ru, "t", "x")
        );
        assert_eq!(GenerationCache::key(Language::En, "t", "x").len(), 64);
    }

    #[test]
    fn test_key_depends_on_title() {
        assert_ne!(
            GenerationCache::key(Language::En, "Rust", "x"),
            GenerationCache::key(Language::En, "Go", "x")
        );
        // the separator keeps title and input from sliding into each other
        assert_ne!(
            GenerationCache::key(Language::En, "ab", "c"),
            GenerationCache::key(Language::En, "a", "bc")
        );
    }
}
