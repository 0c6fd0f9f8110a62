use crate::model::{DocumentRef, FileRecord};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// In-memory path → `FileRecord` registry.
///
/// Writes are validated; a malformed record is dropped with a warning
/// rather than surfaced as an error, so callers treat a degraded cache
/// the same as a cold one.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<String, FileRecord>,
    rejected_writes: u64,
}

fn record_is_valid(record: &FileRecord) -> bool {
    record.size >= 0 && !record.content_hash.is_empty()
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an externally supplied snapshot, revalidating entry by
    /// entry. Invalid entries are dropped outright so corrupt state never
    /// carries forward into new writes.
    pub fn from_snapshot(snapshot: HashMap<String, FileRecord>) -> Self {
        let total = snapshot.len();
        let mut entries = HashMap::with_capacity(total);
        for (path, mut record) in snapshot {
            if !record_is_valid(&record) {
                warn!("Dropping invalid cache entry for '{}'", path);
                continue;
            }
            record.path = path.clone();
            entries.insert(path, record);
        }
        if entries.len() < total {
            debug!(
                "Cache snapshot loaded with {} of {} entries valid",
                entries.len(),
                total
            );
        }
        Self {
            entries,
            rejected_writes: 0,
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    /// Look up a record and validate it against the live document. Only a
    /// record whose stored size and modified time both match is reusable.
    pub fn get_valid(&self, doc: &DocumentRef) -> Option<&FileRecord> {
        let record = self.entries.get(&doc.path)?;
        if record.size == doc.size && record.modified == doc.modified {
            trace!("Cache hit for '{}'", doc.path);
            Some(record)
        } else {
            trace!("Stale cache entry for '{}'", doc.path);
            None
        }
    }

    /// Insert keyed by `path`, stamping the path into the stored record.
    /// Malformed records are silently ignored; returns whether the write
    /// was accepted.
    pub fn set(&mut self, path: &str, mut record: FileRecord) -> bool {
        if !record_is_valid(&record) {
            warn!("Rejecting invalid cache record for '{}'", path);
            self.rejected_writes += 1;
            return false;
        }
        record.path = path.to_string();
        self.entries.insert(path.to_string(), record);
        true
    }

    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.entries.remove(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes
    }

    pub fn snapshot(&self) -> &HashMap<String, FileRecord> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str) -> FileRecord {
        FileRecord {
            path: String::new(),
            size: 100,
            modified: 1_700_000_000,
            content_hash: hash.to_string(),
            normalized_hash: None,
        }
    }

    #[test]
    fn test_set_stamps_path() {
        let mut cache = MetadataCache::new();
        assert!(cache.set("a.txt", record("abc")));
        assert_eq!(cache.get("a.txt").unwrap().path, "a.txt");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_rejects_empty_hash() {
        let mut cache = MetadataCache::new();
        assert!(!cache.set("a.txt", record("")));
        assert!(cache.get("a.txt").is_none());
        assert_eq!(cache.rejected_writes(), 1);
    }

    #[test]
    fn test_set_rejects_negative_size() {
        let mut cache = MetadataCache::new();
        let mut bad = record("abc");
        bad.size = -1;
        assert!(!cache.set("a.txt", bad));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_valid_requires_matching_metadata() {
        let mut cache = MetadataCache::new();
        cache.set("a.txt", record("abc"));

        let live = DocumentRef {
            path: "a.txt".to_string(),
            size: 100,
            modified: 1_700_000_000,
        };
        assert!(cache.get_valid(&live).is_some());

        let resized = DocumentRef { size: 101, ..live.clone() };
        assert!(cache.get_valid(&resized).is_none());

        let touched = DocumentRef {
            modified: 1_700_000_001,
            ..live
        };
        assert!(cache.get_valid(&touched).is_none());
    }

    #[test]
    fn test_from_snapshot_drops_invalid_entries() {
        let mut snapshot = HashMap::new();
        snapshot.insert("good.txt".to_string(), record("abc"));
        snapshot.insert("bad.txt".to_string(), record(""));
        let cache = MetadataCache::from_snapshot(snapshot);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("good.txt").is_some());
        assert!(cache.get("bad.txt").is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = MetadataCache::new();
        cache.set("a.txt", record("abc"));
        cache.set("b.txt", record("def"));
        assert!(cache.remove("a.txt").is_some());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
