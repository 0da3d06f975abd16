//! The storage index: uploads, lookups, and garbage collection
//!
//! Composes the record store and the blob store. Uploads write the record
//! first and then stream the blob; the two stores are reconciled by
//! `collect()` rather than by cross-store transactions.

use crate::blobs::BlobStore;
use crate::clock::Clock;
use crate::error::{IndexError, Result};
use crate::records::RecordStore;
use crate::types::FileDescriptor;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Durable index of uploaded files. Owns the record store connection and the
/// blob root; callers only ever see identifiers and descriptors.
pub struct StorageIndex {
    records: RecordStore,
    blobs: BlobStore,
    clock: Arc<dyn Clock>,
}

impl StorageIndex {
    /// Provision both stores and build the index. Creates the blob root
    /// (with parents) and the record schema; both steps are idempotent and
    /// never destructive. Any failure here is fatal to startup.
    pub async fn new(
        records: RecordStore,
        blobs: BlobStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        blobs.init().await.map_err(|e| {
            IndexError::Init(format!("blob root {}: {}", blobs.root().display(), e))
        })?;
        records
            .migrate()
            .await
            .map_err(|e| IndexError::Init(format!("record schema: {}", e)))?;
        Ok(Self {
            records,
            blobs,
            clock,
        })
    }

    /// Store a new file and return its identifier.
    ///
    /// The identifier is a random UUID v4; collisions are ruled out by the
    /// identifier space, not by an existence check. Zero or negative
    /// lifetimes are accepted and simply produce a record that the next
    /// collection pass is free to remove; rejecting them is the request
    /// layer's business.
    ///
    /// The record is inserted before the blob is written. If the blob write
    /// fails, the record stays behind and points at a missing blob until it
    /// expires and is swept; the error is still surfaced to the caller.
    pub async fn upload<R>(&self, lifetime_secs: i64, content: &mut R, name: &str) -> Result<String>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let id = Uuid::new_v4().to_string();
        let expires_at = self.clock.now_utc_secs().saturating_add(lifetime_secs);

        if let Err(e) = self.records.insert(&id, expires_at, name).await {
            warn!(name = %name, error = %e, "upload failed: record insert");
            return Err(e.into());
        }
        match self.blobs.write(&id, content).await {
            Ok(size) => {
                info!(id = %id, name = %name, size, lifetime_secs, "stored file");
                Ok(id)
            }
            Err(e) => {
                warn!(id = %id, name = %name, error = %e, "blob write failed after record insert");
                Err(e.into())
            }
        }
    }

    /// Look up a file by identifier and assemble its descriptor.
    ///
    /// Fails with [`IndexError::NotFound`] when no record exists. A record
    /// whose expiration has already passed is still returned as long as no
    /// collection pass has removed it: expiry is enforced by eventual
    /// collection, not by query-time filtering.
    pub async fn get(&self, id: &str) -> Result<FileDescriptor> {
        match self.records.get(id).await? {
            Some(record) => Ok(FileDescriptor {
                path: self.blobs.path_for(&record.id),
                id: record.id,
                expires_at: record.expires_at,
                name: record.name,
            }),
            None => Err(IndexError::NotFound(id.to_string())),
        }
    }

    /// Total number of records, expired or not. Observability only.
    pub async fn count(&self) -> Result<i64> {
        Ok(self.records.count().await?)
    }

    /// Read a stored blob's bytes by descriptor identifier.
    pub async fn read_content(&self, id: &str) -> Result<Vec<u8>> {
        Ok(self.blobs.read(id).await?)
    }

    /// Run one garbage collection pass: drop expired records, then drop
    /// blobs that no longer have a record.
    ///
    /// The phases are independent; a failure in the record sweep never
    /// prevents the blob sweep from running. Blob deletions are not
    /// transactional: entries removed before a failure stay removed. The
    /// whole pass is idempotent. The first phase error, if any, is returned
    /// after both phases have been attempted.
    pub async fn collect(&self) -> Result<()> {
        debug!("starting expired record sweep");
        let mut first_error = None;
        match self.records.delete_expired(self.clock.now_utc_secs()).await {
            Ok(removed) if removed > 0 => {
                info!(removed, "expired record sweep finished");
            }
            Ok(_) => debug!("expired record sweep finished; nothing to remove"),
            Err(e) => {
                warn!(error = %e, "expired record sweep failed");
                first_error = Some(e.into());
            }
        }

        debug!("starting orphaned blob sweep");
        match self.sweep_orphans().await {
            Ok(removed) if removed > 0 => {
                info!(removed, "orphaned blob sweep finished");
            }
            Ok(_) => debug!("orphaned blob sweep finished; nothing to remove"),
            Err(e) => {
                warn!(error = %e, "orphaned blob sweep failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete every blob whose identifier has no record. The walk aborts on
    /// the first store or deletion error; already-removed blobs stay removed.
    async fn sweep_orphans(&self) -> Result<u64> {
        let mut removed = 0u64;
        for name in self.blobs.list().await? {
            if !self.records.exists(&name).await? {
                self.blobs.remove(&name).await?;
                debug!(id = %name, "removed orphaned blob");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Release the record store connection. Any operation after this fails.
    pub async fn close(&self) {
        self.records.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::path::Path;
    use tempfile::tempdir;
    use tokio::fs;

    async fn make_index(dir: &Path, clock: Arc<ManualClock>) -> StorageIndex {
        let records = RecordStore::connect(&dir.join("index.db")).await.unwrap();
        let blobs = BlobStore::new(dir.join("files"));
        StorageIndex::new(records, blobs, clock).await.unwrap()
    }

    async fn blob_names(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir.join("files")).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_new_provisions_empty_stores() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock).await;

        assert!(dir.path().join("files").is_dir());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock).await;

        let err = index.get("some-id").await.unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upload_roundtrip() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(10));
        let index = make_index(dir.path(), clock).await;

        let content: [u8; 10] = [0, 1, 2, 3, 5, 8, 13, 21, 34, 56];
        let id = index
            .upload(120, &mut &content[..], "file1")
            .await
            .unwrap();
        Uuid::parse_str(&id).expect("identifier should be a valid UUID");
        assert_eq!(id.len(), 36);

        assert_eq!(index.count().await.unwrap(), 1);

        let descriptor = index.get(&id).await.unwrap();
        assert_eq!(descriptor.id, id);
        assert_eq!(descriptor.name, "file1");
        assert_eq!(descriptor.expires_at, 130);
        assert_eq!(descriptor.path, dir.path().join("files").join(&id));
        assert_eq!(index.read_content(&id).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_empty_content() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock).await;

        let id = index.upload(60, &mut &b""[..], "empty").await.unwrap();
        assert_eq!(index.read_content(&id).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_multiple_uploads_are_independent() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        let contents: Vec<Vec<u8>> = vec![
            vec![1, 2, 3, 4],
            vec![],
            vec![200, 100, 64, 65, 88, 0, 1, 5],
            vec![5],
        ];
        let mut ids = Vec::new();
        for (i, content) in contents.iter().enumerate() {
            clock.set(i as i64);
            let id = index
                .upload(60, &mut content.as_slice(), &format!("file{}", i))
                .await
                .unwrap();
            ids.push(id);
        }

        assert_eq!(index.count().await.unwrap(), contents.len() as i64);
        for (i, id) in ids.iter().enumerate() {
            let descriptor = index.get(id).await.unwrap();
            assert_eq!(descriptor.expires_at, i as i64 + 60);
            assert_eq!(index.read_content(id).await.unwrap(), contents[i]);
        }

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[tokio::test]
    async fn test_expiry_boundary_is_strict() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        // expires at exactly 10
        let id = index.upload(10, &mut &b"x"[..], "boundary").await.unwrap();

        clock.set(10);
        index.collect().await.unwrap();
        // expires == now is retained: deletion predicate is strictly less-than
        assert!(index.get(&id).await.is_ok());
        assert_eq!(index.count().await.unwrap(), 1);

        clock.set(11);
        index.collect().await.unwrap();
        assert!(index.get(&id).await.unwrap_err().is_not_found());
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(blob_names(dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_staggered_expiry_collection() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        // uploads at t=0,1,2,3 with lifetimes 10,20,30,40 -> expirations 10,21,32,43
        let mut ids = Vec::new();
        for i in 0..4i64 {
            clock.set(i);
            let id = index
                .upload((i + 1) * 10, &mut &[i as u8][..], &format!("file{}", i))
                .await
                .unwrap();
            ids.push(id);
        }
        assert_eq!(index.count().await.unwrap(), 4);

        clock.set(15);
        index.collect().await.unwrap();

        assert_eq!(index.count().await.unwrap(), 3);
        assert!(index.get(&ids[0]).await.unwrap_err().is_not_found());
        for id in &ids[1..] {
            assert!(index.get(id).await.is_ok());
        }
        let mut expected: Vec<String> = ids[1..].to_vec();
        expected.sort();
        assert_eq!(blob_names(dir.path()).await, expected);
    }

    #[tokio::test]
    async fn test_collect_is_idempotent() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        index.upload(5, &mut &b"a"[..], "short").await.unwrap();
        index.upload(100, &mut &b"b"[..], "long").await.unwrap();

        clock.set(50);
        index.collect().await.unwrap();
        let count_after_first = index.count().await.unwrap();
        let blobs_after_first = blob_names(dir.path()).await;

        index.collect().await.unwrap();
        assert_eq!(index.count().await.unwrap(), count_after_first);
        assert_eq!(blob_names(dir.path()).await, blobs_after_first);
        assert_eq!(count_after_first, 1);
    }

    #[tokio::test]
    async fn test_orphaned_blob_is_swept() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock).await;

        let kept = index.upload(100, &mut &b"keep"[..], "kept").await.unwrap();
        fs::write(dir.path().join("files").join("stray-blob"), b"orphan")
            .await
            .unwrap();

        index.collect().await.unwrap();

        assert_eq!(blob_names(dir.path()).await, vec![kept.clone()]);
        assert_eq!(index.read_content(&kept).await.unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_failed_blob_write_leaves_record_until_expiry() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        // Make blob writes fail by turning the root into a regular file
        let root = dir.path().join("files");
        fs::remove_dir(&root).await.unwrap();
        fs::write(&root, b"").await.unwrap();

        let err = index.upload(10, &mut &b"x"[..], "broken").await.unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
        // The record was inserted before the blob write and stays behind
        assert_eq!(index.count().await.unwrap(), 1);

        fs::remove_file(&root).await.unwrap();
        fs::create_dir(&root).await.unwrap();

        // Not yet expired: collection leaves the stranded record alone
        clock.set(5);
        index.collect().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        // Past expiry the sweep closes the inconsistency window
        clock.set(11);
        index.collect().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_huge_lifetime_saturates() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(100));
        let index = make_index(dir.path(), clock).await;

        let id = index
            .upload(i64::MAX, &mut &b"x"[..], "forever")
            .await
            .unwrap();
        assert_eq!(index.get(&id).await.unwrap().expires_at, i64::MAX);
    }

    #[tokio::test]
    async fn test_expired_record_retrievable_until_collected() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock.clone()).await;

        let id = index.upload(10, &mut &b"x"[..], "late").await.unwrap();

        // Well past expiry, but no collection pass has run: lookups still
        // succeed. Expiry is enforced by collection, not by get().
        clock.set(1000);
        let descriptor = index.get(&id).await.unwrap();
        assert_eq!(descriptor.expires_at, 10);

        index.collect().await.unwrap();
        assert!(index.get(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_close_makes_operations_fail() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let index = make_index(dir.path(), clock).await;

        index.close().await;
        assert!(index.count().await.is_err());
        assert!(index.upload(10, &mut &b"x"[..], "late").await.is_err());
    }
}
