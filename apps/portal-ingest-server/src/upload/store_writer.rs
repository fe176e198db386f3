//! Store Writer
//!
//! Streams accepted uploads into `{base_dir}/{category}/{uuid}.{ext}`.
//!
//! Guarantees:
//! - Bounded memory: one body chunk is held at a time
//! - Never overwrites: files are opened with create-new semantics
//! - No partial artifacts: a drop guard removes the destination unless the
//!   write was flushed, synced and committed. The guard also fires when the
//!   request future is dropped because the client disconnected.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use super::types::{BodyError, MediaType, StoreError, StoredFile, UploadCategory};

// ============================================================================
// Store Writer
// ============================================================================

/// Writes uploads under a local base directory
#[derive(Debug, Clone)]
pub struct StoreWriter {
    base_dir: PathBuf,
}

impl StoreWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn category_dir(&self, category: UploadCategory) -> PathBuf {
        self.base_dir.join(category.as_str())
    }

    /// Create every category directory and check it accepts writes.
    ///
    /// Idempotent; run once at startup so a bad base directory stops the
    /// process before it accepts requests.
    pub async fn initialize(&self) -> std::io::Result<()> {
        for category in UploadCategory::ALL {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).await?;

            let probe = dir.join(format!(".write-probe-{}", Uuid::new_v4()));
            File::create(&probe).await?;
            fs::remove_file(&probe).await?;

            tracing::debug!(category = %category, dir = %dir.display(), "Storage directory ready");
        }
        Ok(())
    }

    /// Stream `body` into a freshly named file.
    ///
    /// Fails with [`StoreError::TooLarge`] as soon as more than `max_bytes`
    /// arrive. On any error the destination is removed before returning.
    pub async fn write<S>(
        &self,
        category: UploadCategory,
        media_type: MediaType,
        max_bytes: u64,
        mut body: S,
    ) -> Result<StoredFile, StoreError>
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Unpin,
    {
        let dir = self.category_dir(category);
        // create_dir_all treats "already exists" as success, so concurrent
        // first writers don't race
        fs::create_dir_all(&dir).await?;

        let id = Uuid::new_v4();
        let path = dir.join(format!("{}.{}", id, media_type.extension()));

        let file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Collision(path));
            }
            Err(e) => return Err(e.into()),
        };
        let guard = PartialFile::new(path.clone());

        let size = persist(file, guard, max_bytes, &mut body).await?;

        tracing::debug!(
            category = %category,
            file_id = %id,
            size = size,
            "Upload written"
        );

        Ok(StoredFile {
            category,
            id,
            media_type,
            size,
            path,
        })
    }

    /// Map a public file name back to its path.
    ///
    /// Only names of the generated shape `<uuid>.<ext>` resolve, so nothing
    /// outside the category directory is reachable.
    pub fn resolve(&self, category: UploadCategory, file_name: &str) -> Option<(PathBuf, MediaType)> {
        let (stem, ext) = file_name.split_once('.')?;
        let id = Uuid::parse_str(stem).ok()?;
        let media_type = MediaType::from_extension(ext)?;

        // Reject non-canonical spellings of the same id
        if id.to_string() != stem {
            return None;
        }

        Some((self.category_dir(category).join(file_name), media_type))
    }
}

// ============================================================================
// Streaming
// ============================================================================

/// Where an upload's bytes land
trait Destination: AsyncWrite + Unpin {
    /// Make written bytes durable
    async fn sync(&mut self) -> std::io::Result<()>;
}

impl Destination for File {
    async fn sync(&mut self) -> std::io::Result<()> {
        self.sync_all().await
    }
}

/// Copy `body` into `dest` and settle `guard` with the outcome
async fn persist<D, S>(
    mut dest: D,
    guard: PartialFile,
    max_bytes: u64,
    body: &mut S,
) -> Result<u64, StoreError>
where
    D: Destination,
    S: Stream<Item = Result<Bytes, BodyError>> + Unpin,
{
    let result = copy_body(&mut dest, max_bytes, body).await;
    drop(dest);

    match result {
        Ok(size) => {
            guard.commit();
            Ok(size)
        }
        Err(e) => {
            guard.discard().await;
            Err(e)
        }
    }
}

async fn copy_body<D, S>(dest: &mut D, max_bytes: u64, body: &mut S) -> Result<u64, StoreError>
where
    D: Destination,
    S: Stream<Item = Result<Bytes, BodyError>> + Unpin,
{
    let mut size: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| match e {
            BodyError::LimitExceeded => StoreError::TooLarge { max: max_bytes },
            BodyError::Interrupted(reason) => StoreError::Interrupted(reason),
        })?;

        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(StoreError::TooLarge { max: max_bytes });
        }

        dest.write_all(&chunk).await?;
    }

    dest.flush().await?;
    dest.sync().await?;
    Ok(size)
}

// ============================================================================
// Partial File Guard
// ============================================================================

/// Removes an unfinished upload that was neither committed nor discarded.
///
/// Error paths call [`PartialFile::discard`]; `Drop` only covers a write
/// future dropped mid-stream.
struct PartialFile {
    path: PathBuf,
    settled: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            settled: false,
        }
    }

    fn commit(mut self) {
        self.settled = true;
    }

    async fn discard(mut self) {
        self.settled = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::warn!(path = %self.path.display(), "Removed partial upload");
            }
            Err(e) => log_cleanup_failure(&self.path, e),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // Drop can't await; unlink is a single syscall
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::warn!(path = %self.path.display(), "Removed abandoned upload");
            }
            Err(e) => log_cleanup_failure(&self.path, e),
        }
    }
}

fn log_cleanup_failure(path: &Path, e: std::io::Error) {
    if e.kind() != ErrorKind::NotFound {
        tracing::error!(
            path = %path.display(),
            error = %e,
            "Failed to remove partial upload"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
