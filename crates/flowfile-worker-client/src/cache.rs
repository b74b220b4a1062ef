use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Content-addressed cache of materialized artifacts, keyed by `file_ref`.
/// LRU by last-access time, evicted opportunistically after each insert once
/// the configured byte budget is exceeded — no background eviction thread,
/// keeping the engine's single-logical-executor model intact.
#[derive(Clone)]
pub struct ArtifactCache {
    entries: Arc<DashMap<blake3::Hash, CacheEntry>>,
    bytes_in_use: Arc<AtomicU64>,
    byte_budget: u64,
}

#[derive(Clone)]
struct CacheEntry {
    path: PathBuf,
    size_bytes: u64,
    last_access: Instant,
}

impl ArtifactCache {
    pub fn new(byte_budget: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            bytes_in_use: Arc::new(AtomicU64::new(0)),
            byte_budget,
        }
    }

    /// Registers a freshly written artifact and evicts oldest-accessed
    /// entries until usage is back under budget.
    pub fn insert(&self, file_ref: blake3::Hash, path: PathBuf, size_bytes: u64) {
        if let Some(old) = self.entries.insert(
            file_ref,
            CacheEntry {
                path,
                size_bytes,
                last_access: Instant::now(),
            },
        ) {
            self.bytes_in_use.fetch_sub(old.size_bytes, Ordering::Relaxed);
        }
        self.bytes_in_use.fetch_add(size_bytes, Ordering::Relaxed);
        self.evict_if_over_budget();
    }

    /// Looks up a cached artifact's path, bumping its last-access time so it
    /// survives the next eviction pass.
    pub fn get(&self, file_ref: &blake3::Hash) -> Option<PathBuf> {
        self.entries.get_mut(file_ref).map(|mut entry| {
            entry.last_access = Instant::now();
            entry.path.clone()
        })
    }

    pub fn contains(&self, file_ref: &blake3::Hash) -> bool {
        self.entries.contains_key(file_ref)
    }

    pub fn bytes_in_use(&self) -> u64 {
        self.bytes_in_use.load(Ordering::Relaxed)
    }

    fn evict_if_over_budget(&self) {
        if self.bytes_in_use.load(Ordering::Relaxed) <= self.byte_budget {
            return;
        }
        let mut by_age: Vec<(blake3::Hash, Instant, u64)> = self
            .entries
            .iter()
            .map(|e| (*e.key(), e.value().last_access, e.value().size_bytes))
            .collect();
        by_age.sort_by_key(|(_, last_access, _)| *last_access);

        for (file_ref, _, size_bytes) in by_age {
            if self.bytes_in_use.load(Ordering::Relaxed) <= self.byte_budget {
                break;
            }
            if let Some((_, entry)) = self.entries.remove(&file_ref) {
                let _ = std::fs::remove_file(&entry.path);
                self.bytes_in_use.fetch_sub(size_bytes, Ordering::Relaxed);
                tracing::debug!(file_ref = %file_ref.to_hex(), "evicted artifact from cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_respects_byte_budget() {
        let cache = ArtifactCache::new(10);
        let dir = tempfile::tempdir().unwrap();

        for i in 0..3u8 {
            let path = dir.path().join(format!("{i}.parquet"));
            std::fs::write(&path, vec![0u8; 8]).unwrap();
            cache.insert(blake3::hash(&[i]), path, 8);
        }

        assert!(cache.bytes_in_use() <= 10);
        assert!(cache.contains(&blake3::hash(&[2])));
    }

    #[test]
    fn get_bumps_recency() {
        let cache = ArtifactCache::new(1_000_000);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.parquet");
        std::fs::write(&path, vec![0u8; 4]).unwrap();
        let file_ref = blake3::hash(b"a");
        cache.insert(file_ref, path.clone(), 4);
        assert_eq!(cache.get(&file_ref), Some(path));
    }
}
