//! Checksummed storage for completed cleaning runs.
//!
//! A run is serialized to JSON once, sealed with a SHA-256 checksum, and kept
//! in a bounded TTL cache. Every read re-verifies the checksum; an entry that
//! fails is dropped and reported as absent.

use moka::future::Cache;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::CleanResponse;

/// Serialized payload with its SHA-256 checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCacheEntry {
    /// Payload as JSON
    pub data: String,
    /// SHA-256 of `data`, hex encoded
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    /// Serializes `value` and seals it
    pub fn seal<T: Serialize>(value: &T) -> Result<Self, AppError> {
        let data = serde_json::to_string(value)?;
        Ok(Self::new(data))
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// True when the checksum still matches the payload
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Verifies and deserializes the payload
    ///
    /// Returns `None` on a checksum mismatch or a payload that no longer
    /// parses as `T`.
    pub fn open<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.is_valid() {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                self.checksum,
                self.data.len()
            );
            return None;
        }

        match serde_json::from_str(&self.data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cached payload no longer deserializes: {}", e);
                None
            }
        }
    }
}

/// Completed clean responses keyed by run id
#[derive(Clone)]
pub struct RunStore {
    runs: Cache<Uuid, ValidatedCacheEntry>,
}

impl RunStore {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            runs: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    pub async fn put(&self, response: &CleanResponse) -> Result<(), AppError> {
        let entry = ValidatedCacheEntry::seal(response)?;
        tracing::debug!(
            "Storing run {} ({} bytes, checksum {})",
            response.run_id,
            entry.data.len(),
            &entry.checksum[..12]
        );
        self.runs.insert(response.run_id, entry).await;
        Ok(())
    }

    /// Stored run, or `None` when unknown, expired, or corrupted
    pub async fn get(&self, run_id: &Uuid) -> Option<CleanResponse> {
        let entry = self.runs.get(run_id).await?;
        match entry.open() {
            Some(response) => Some(response),
            None => {
                self.runs.invalidate(run_id).await;
                None
            }
        }
    }

    /// Writes an entry as-is, bypassing sealing
    #[cfg(test)]
    async fn put_raw(&self, run_id: Uuid, entry: ValidatedCacheEntry) {
        self.runs.insert(run_id, entry).await;
    }
}
