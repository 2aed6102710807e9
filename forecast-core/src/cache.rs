//! On-disk response cache keyed by request signature.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, fs, io, path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::{
    error::FetchError,
    transport::{ApiReply, ApiRequest, Transport},
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    signature: String,
    stored_at: DateTime<Utc>,
    status: u16,
    body: String,
}

/// One JSON file per cached response.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: PathBuf, ttl: Duration) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn entry_path(&self, signature: &str) -> PathBuf {
        let digest = Sha256::digest(signature.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Cached reply for `signature` if one was stored less than `ttl` before `now`.
    pub fn get(&self, signature: &str, now: DateTime<Utc>) -> Result<Option<ApiReply>> {
        let path = self.entry_path(signature);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read cache entry: {}", path.display()));
            }
        };

        let entry: CacheEntry = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", path.display()))?;

        // Guards against a digest collision.
        if entry.signature != signature {
            return Ok(None);
        }

        let age = now.signed_duration_since(entry.stored_at);
        let fresh = age
            .to_std()
            .map(|age| age < self.ttl)
            // stored in the future: clock went backwards, treat as fresh
            .unwrap_or(true);

        if !fresh {
            debug!(signature, age_secs = age.num_seconds(), "cache entry expired");
            return Ok(None);
        }

        Ok(Some(ApiReply { status: entry.status, body: entry.body }))
    }

    pub fn put(&self, signature: &str, reply: &ApiReply, now: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            signature: signature.to_string(),
            stored_at: now,
            status: reply.status,
            body: reply.body.clone(),
        };
        let path = self.entry_path(signature);
        let json = serde_json::to_string(&entry).context("Failed to serialize cache entry")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))
    }

    /// Remove every cached entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list cache directory: {}", self.dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Serves fresh cached replies and stores successful ones from the inner transport.
pub struct CachingTransport<T: Transport> {
    inner: T,
    cache: DiskCache,
    clock: Clock,
}

impl<T: Transport> fmt::Debug for CachingTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingTransport")
            .field("inner", &self.inner)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T, cache: DiskCache) -> Self {
        Self::with_clock(inner, cache, Arc::new(Utc::now))
    }

    pub fn with_clock(inner: T, cache: DiskCache, clock: Clock) -> Self {
        Self { inner, cache, clock }
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn get(&self, request: &ApiRequest) -> Result<ApiReply, FetchError> {
        let signature = request.signature();

        match self.cache.get(&signature, (self.clock)()) {
            Ok(Some(reply)) => {
                debug!(%signature, "cache hit");
                return Ok(reply);
            }
            Ok(None) => debug!(%signature, "cache miss"),
            Err(e) => warn!(error = %format!("{e:#}"), "ignoring unreadable cache entry"),
        }

        let reply = self.inner.get(request).await?;

        if reply.status == 200 {
            match self.cache.put(&signature, &reply, (self.clock)()) {
                Ok(()) => debug!(%signature, "stored response in cache"),
                Err(e) => warn!(error = %format!("{e:#}"), "failed to store response in cache"),
            }
        }

        Ok(reply)
    }
}
