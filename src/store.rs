use crate::error::Error;
use crate::model::DocumentRef;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;
use walkdir::WalkDir;

/// Narrow capability interface over the host document store. The engine
/// depends only on this trait, never on a concrete store type.
pub trait DocumentStore {
    /// Enumerate every document. Failure here is the one fatal scan error.
    fn list_documents(&self) -> Result<Vec<DocumentRef>, Error>;
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, Error>;
    fn read_text(&self, path: &str) -> Result<String, Error>;
}

/// Path-prefix match or size-over-cap.
pub fn should_ignore(doc: &DocumentRef, ignore_prefixes: &[String], size_cap_bytes: i64) -> bool {
    if doc.size > size_cap_bytes {
        return true;
    }
    ignore_prefixes
        .iter()
        .any(|prefix| doc.path.starts_with(prefix.as_str()))
}

/// Filesystem-backed store rooted at a directory. Paths handed out are
/// relative to the root so cache entries survive a root relocation.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

impl DocumentStore for FsDocumentStore {
    fn list_documents(&self) -> Result<Vec<DocumentRef>, Error> {
        if !self.root.is_dir() {
            return Err(Error::Store(format!(
                "root directory not found: {}",
                self.root.display()
            )));
        }

        let mut docs = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    warn!(
                        "Error getting metadata for {}: {}",
                        entry.path().display(),
                        err
                    );
                    continue;
                }
            };
            if metadata.len() == 0 {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            docs.push(DocumentRef {
                path: self.relative_path(entry.path()),
                size: metadata.len() as i64,
                modified,
            });
        }
        Ok(docs)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, Error> {
        Ok(fs::read(self.resolve(path))?)
    }

    fn read_text(&self, path: &str) -> Result<String, Error> {
        Ok(fs::read_to_string(self.resolve(path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, size: i64) -> DocumentRef {
        DocumentRef {
            path: path.to_string(),
            size,
            modified: 1_700_000_000,
        }
    }

    #[test]
    fn test_should_ignore_prefix() {
        let prefixes = vec!["archive/".to_string(), "tmp/".to_string()];
        assert!(should_ignore(&doc("archive/old.txt", 10), &prefixes, 1000));
        assert!(should_ignore(&doc("tmp/scratch.md", 10), &prefixes, 1000));
        assert!(!should_ignore(&doc("notes/today.md", 10), &prefixes, 1000));
    }

    #[test]
    fn test_should_ignore_size_cap() {
        assert!(should_ignore(&doc("big.txt", 1001), &[], 1000));
        assert!(!should_ignore(&doc("exact.txt", 1000), &[], 1000));
    }

    #[test]
    fn test_fs_store_lists_and_reads() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("a.txt"), "hello").unwrap();
        std::fs::write(tmp.path().join("sub/b.txt"), "world").unwrap();
        std::fs::write(tmp.path().join("empty.txt"), "").unwrap();

        let store = FsDocumentStore::new(tmp.path());
        let mut docs = store.list_documents().unwrap();
        docs.sort_by(|a, b| a.path.cmp(&b.path));

        // Empty file skipped
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].path, "a.txt");
        assert_eq!(docs[0].size, 5);

        assert_eq!(store.read_bytes("a.txt").unwrap(), b"hello");
        assert_eq!(store.read_text("sub/b.txt").unwrap(), "world");
    }

    #[test]
    fn test_fs_store_missing_root_is_fatal() {
        let store = FsDocumentStore::new("/definitely/not/a/real/dir");
        assert!(store.list_documents().is_err());
    }
}
