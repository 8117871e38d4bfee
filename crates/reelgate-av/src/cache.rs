//! Content-addressed on-disk rendition cache.
//!
//! A rendition is keyed by a SHA-256 digest of the absolute source path
//! plus the quality label; existence of the completed file on disk IS the
//! cache index. Two invariants hold:
//!
//! - **Single-flight**: an in-process map keyed by the cache file name
//!   allows at most one concurrent encode per rendition. Late arrivals
//!   subscribe to the in-flight job's result instead of starting a second
//!   encoder.
//! - **Atomic publication**: the encoder writes to a `.partial` sibling
//!   and the file is renamed into place only after a successful exit; no
//!   reader observes a half-written rendition under the final name.
//!
//! The encode job itself runs on a detached task: a client that
//! disconnects while its rendition is encoding does not abandon the work,
//! the finished entry still lands in the cache for the next request.
//! Entries are never evicted or invalidated against the source's mtime;
//! they persist until externally deleted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use reelgate_common::{Error, Result};

use crate::profiles::{OutputFormat, QualityProfile};

/// Cloneable outcome of an encode job, broadcast to all waiters.
#[derive(Debug, Clone)]
enum EncodeOutcome {
    Done(PathBuf),
    Unavailable(String),
    Failed(String),
}

impl From<Error> for EncodeOutcome {
    fn from(err: Error) -> Self {
        match err {
            Error::ToolNotFound { tool } => EncodeOutcome::Unavailable(tool),
            other => EncodeOutcome::Failed(other.to_string()),
        }
    }
}

impl EncodeOutcome {
    fn into_result(self) -> Result<PathBuf> {
        match self {
            EncodeOutcome::Done(path) => Ok(path),
            EncodeOutcome::Unavailable(tool) => Err(Error::tool_not_found(tool)),
            EncodeOutcome::Failed(message) => Err(Error::tool_failed("ffmpeg", message)),
        }
    }
}

type OutcomeRx = watch::Receiver<Option<EncodeOutcome>>;

/// Disk-backed cache of transcoded renditions.
#[derive(Debug, Clone)]
pub struct RenditionCache {
    root: PathBuf,
    inflight: Arc<DashMap<String, OutcomeRx>>,
}

impl RenditionCache {
    /// Create a cache rooted at `root`. The directory is created lazily on
    /// first encode.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// The cache's backing directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic cache key for a source path: SHA-256 over the full
    /// path string. Wide enough that distinct paths never collide in
    /// practice.
    pub fn cache_key(source: &Path) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_os_str().as_encoded_bytes());
        hex::encode(hasher.finalize())
    }

    /// The on-disk location a rendition for `(source, quality)` lives at.
    pub fn rendition_path(
        &self,
        source: &Path,
        quality: QualityProfile,
        format: OutputFormat,
    ) -> PathBuf {
        let key = Self::cache_key(source);
        self.root
            .join(format!("{key}-{}.{}", quality.label(), format.ext()))
    }

    /// Check for a completed rendition. No freshness check against the
    /// source's mtime; staleness is accepted.
    pub fn lookup(
        &self,
        source: &Path,
        quality: QualityProfile,
        format: OutputFormat,
    ) -> Option<PathBuf> {
        let path = self.rendition_path(source, quality, format);
        path.is_file().then_some(path)
    }

    /// Return the cached rendition for `(source, quality)`, encoding it
    /// first if absent.
    ///
    /// `encode` receives the temporary output path to write to; it runs at
    /// most once per rendition across all concurrent callers. Failed
    /// encodes are not cached: the error is reported to every current
    /// waiter and the next request re-attempts.
    pub async fn get_or_encode<F, Fut>(
        &self,
        source: &Path,
        quality: QualityProfile,
        format: OutputFormat,
        encode: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let final_path = self.rendition_path(source, quality, format);
        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            return Ok(final_path);
        }

        let key = match final_path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return Err(Error::internal("rendition path has no file name")),
        };

        let mut rx = self.subscribe_or_spawn(key, final_path, encode);

        loop {
            let seen = rx.borrow_and_update().clone();
            if let Some(outcome) = seen {
                return outcome.into_result();
            }
            if rx.changed().await.is_err() {
                return Err(Error::internal("encode job ended without a result"));
            }
        }
    }

    /// Join the in-flight job for `key`, or become its leader and spawn
    /// the encode task.
    fn subscribe_or_spawn<F, Fut>(&self, key: String, final_path: PathBuf, encode: F) -> OutcomeRx
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        use dashmap::mapref::entry::Entry;

        let (tx, rx) = match self.inflight.entry(key.clone()) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx.clone());
                (tx, rx)
            }
        };

        let inflight = Arc::clone(&self.inflight);
        tokio::spawn(async move {
            let outcome = run_encode(encode, &final_path).await;
            // Unregister before broadcasting: a request arriving after the
            // send either sees the file on disk or starts a fresh attempt.
            inflight.remove(&key);
            let _ = tx.send(Some(outcome));
        });

        rx
    }
}

/// Run one encode job: write to the temporary path, publish atomically on
/// success, clean up on failure.
async fn run_encode<F, Fut>(encode: F, final_path: &Path) -> EncodeOutcome
where
    F: FnOnce(PathBuf) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    // Another job may have published while this one was queued behind the
    // map insert.
    if tokio::fs::try_exists(final_path).await.unwrap_or(false) {
        return EncodeOutcome::Done(final_path.to_path_buf());
    }

    if let Some(parent) = final_path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return EncodeOutcome::Failed(format!("cannot create cache directory: {e}"));
        }
    }

    let mut tmp = final_path.as_os_str().to_os_string();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);

    match encode(tmp.clone()).await {
        Ok(()) => match tokio::fs::rename(&tmp, final_path).await {
            Ok(()) => {
                tracing::info!(path = %final_path.display(), "rendition cached");
                EncodeOutcome::Done(final_path.to_path_buf())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                EncodeOutcome::Failed(format!("cannot publish rendition: {e}"))
            }
        },
        Err(err) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            tracing::warn!(path = %final_path.display(), error = %err, "encode failed");
            err.into()
        }
    }
}
