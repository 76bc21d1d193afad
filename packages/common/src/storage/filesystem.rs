use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::blob_id::BlobId;
use super::error::StorageError;
use super::traits::{BlobStore, BoxReader};

/// Attempts at linking a finished upload under a fresh id before giving up.
const MAX_LINK_ATTEMPTS: usize = 8;

/// Filesystem-backed blob store.
///
/// Blobs live flat under `{base_path}/{id}`. Uploads are written to
/// `{base_path}/.tmp` first and hard-linked into place, so a blob is either
/// fully present under its id or absent. The temp directory name can never
/// collide with a valid [`BlobId`].
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.base_path.join(id.as_str())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Copy `reader` into `temp_path`, enforcing the size limit.
    async fn spool(&self, mut reader: BoxReader, temp_path: &PathBuf) -> Result<(), StorageError> {
        let mut buf = vec![0u8; 64 * 1024];
        let mut temp_file = fs::File::create(temp_path).await?;
        let mut total_bytes: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            temp_file.write_all(&buf[..n]).await?;
        }

        temp_file.flush().await?;
        temp_file.sync_all().await?;
        Ok(())
    }

    /// Link the spooled file under a fresh id, retrying on collision.
    async fn link_fresh(&self, temp_path: &PathBuf) -> Result<BlobId, StorageError> {
        for _ in 0..MAX_LINK_ATTEMPTS {
            let id = BlobId::generate();
            match fs::hard_link(temp_path, self.blob_path(&id)).await {
                Ok(()) => return Ok(id),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::warn!(blob_id = %id, "Blob id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::IdExhausted(MAX_LINK_ATTEMPTS))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_stream(&self, reader: BoxReader) -> Result<BlobId, StorageError> {
        let temp_path = self.temp_path();

        let result = match self.spool(reader, &temp_path).await {
            Ok(()) => self.link_fresh(&temp_path).await,
            Err(e) => Err(e),
        };

        // The temp name is either linked or garbage at this point.
        let _ = fs::remove_file(&temp_path).await;

        result
    }

    async fn get_stream(&self, id: &BlobId) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.blob_path(id)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &BlobId) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(id)).await?)
    }

    async fn delete(&self, id: &BlobId) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, id: &BlobId) -> Result<u64, StorageError> {
        match fs::metadata(self.blob_path(id)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
