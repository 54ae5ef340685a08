//! File-backed cache of successful forecast responses.
//!
//! One JSON file per request, named by the SHA-256 of the request URL. Entries
//! older than the TTL are treated as absent and overwritten on the next store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    url: String,
    stored_at: DateTime<Utc>,
    body: String,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a request URL.
    pub fn key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"GET ");
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    /// Returns the cached body if a fresh entry exists. Read errors count as a miss.
    pub async fn get(&self, url: &str) -> Option<String> {
        self.get_at(url, Utc::now()).await
    }

    async fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<String> {
        let path = self.entry_path(url);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!("Cache read failed for {}: {}", path.display(), e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        // Hash collisions are not expected, but never serve a different request's body.
        if entry.url != url {
            return None;
        }

        let age = now.signed_duration_since(entry.stored_at);
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        if age < chrono::Duration::zero() || age >= ttl {
            tracing::debug!("Cache entry for {} expired", url);
            return None;
        }

        Some(entry.body)
    }

    /// Stores a response body. Failures are logged and otherwise ignored.
    pub async fn put(&self, url: &str, body: &str) {
        self.put_at(url, body, Utc::now()).await
    }

    async fn put_at(&self, url: &str, body: &str, now: DateTime<Utc>) {
        if let Err(e) = self.write_entry(url, body, now).await {
            tracing::warn!("Failed to store cache entry in {}: {}", self.dir.display(), e);
        }
    }

    async fn write_entry(&self, url: &str, body: &str, now: DateTime<Utc>) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let entry = CacheEntry { url: url.to_string(), stored_at: now, body: body.to_string() };
        let json = serde_json::to_vec(&entry)?;

        // Write then rename so readers never observe a partial file.
        let path = self.entry_path(url);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://api.open-meteo.com/v1/forecast?latitude=1&longitude=2";

    #[tokio::test]
    async fn miss_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));
        assert!(cache.get(URL).await.is_none());
    }

    #[tokio::test]
    async fn stored_body_is_served_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));

        cache.put(URL, "{\"ok\":true}").await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("{\"ok\":true}"));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));

        let stored = Utc::now() - chrono::Duration::hours(2);
        cache.put_at(URL, "old", stored).await;

        assert!(cache.get(URL).await.is_none());
        let fresh = cache.get_at(URL, stored + chrono::Duration::minutes(59)).await;
        assert_eq!(fresh.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn different_urls_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));

        cache.put(URL, "a").await;
        assert!(cache.get(&format!("{URL}&hourly=precipitation")).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_secs(3600));

        std::fs::write(dir.path().join(format!("{}.json", ResponseCache::key(URL))), "not json")
            .unwrap();
        assert!(cache.get(URL).await.is_none());

        cache.put(URL, "fresh").await;
        assert_eq!(cache.get(URL).await.as_deref(), Some("fresh"));
    }

    #[test]
    fn key_is_stable_hex_sha256() {
        let key = ResponseCache::key(URL);
        assert_eq!(key.len(), 64);
        assert_eq!(key, ResponseCache::key(URL));
    }
}
