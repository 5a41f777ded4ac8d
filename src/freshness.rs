//! Snapshot freshness and refresh
//!
//! Each catalog has its own snapshot and TTL. A snapshot is `Missing` when
//! nothing is stored, `Stale` once its age reaches the TTL, `Fresh` otherwise.
//!
//! | flags            | Missing        | Stale    | Fresh    |
//! |------------------|----------------|----------|----------|
//! | `force_download` | Fetch          | Fetch    | Fetch    |
//! | `skip_download`  | UseCache (err) | UseCache | UseCache |
//! | neither          | Fetch          | Fetch    | UseCache |
//!
//! `force_download` wins when both flags are set. A snapshot that cannot be
//! read or decoded falls back to Fetch unless downloads are skipped, in which
//! case the load fails with `CacheUnusable`. Failing to write a fresh snapshot
//! back only logs a warning; the downloaded catalog is still returned. Under
//! `force_download` the stored snapshot is never read.

use crate::error::{FleetError, Result};
use crate::fetch::Fetcher;
use crate::store::{BlobStore, StoredBlob};
use crate::utils::format_duration;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale,
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetch,
    UseCache,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshFlags {
    pub force_download: bool,
    pub skip_download: bool,
}

/// Where a catalog comes from and how long its snapshot stays fresh.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    /// Blob name of the snapshot
    pub name: String,
    pub url: String,
    pub ttl: Duration,
}

fn snapshot_age(modified: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - modified).to_std().unwrap_or(Duration::ZERO)
}

/// Classify a snapshot by its write time. The TTL boundary itself is stale.
pub fn classify(modified: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> Freshness {
    match modified {
        None => Freshness::Missing,
        Some(modified) if snapshot_age(modified, now) >= ttl => Freshness::Stale,
        Some(_) => Freshness::Fresh,
    }
}

pub fn decide(state: Freshness, flags: RefreshFlags) -> Action {
    if flags.force_download {
        return Action::Fetch;
    }
    if flags.skip_download {
        return Action::UseCache;
    }
    match state {
        Freshness::Missing | Freshness::Stale => Action::Fetch,
        Freshness::Fresh => Action::UseCache,
    }
}

/// Loads catalogs from the blob store or, when needed, from the network.
pub struct CatalogLoader<'a> {
    fetcher: &'a dyn Fetcher,
    store: &'a dyn BlobStore,
    flags: RefreshFlags,
    now: DateTime<Utc>,
}

impl<'a> CatalogLoader<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, store: &'a dyn BlobStore, flags: RefreshFlags) -> Self {
        Self {
            fetcher,
            store,
            flags,
            now: Utc::now(),
        }
    }

    /// Evaluate freshness as of `now` instead of the construction time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Load one catalog, running `ingest` over freshly downloaded bytes.
    pub async fn load<T, F>(&self, source: &CatalogSource, ingest: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&[u8]) -> Result<T>,
    {
        if self.flags.force_download {
            debug!(catalog = %source.name, "Forced download, snapshot not read");
            return self.refresh(source, ingest).await;
        }

        let cached = self.store.read(&source.name);
        let state = match &cached {
            Ok(Some(blob)) => classify(Some(blob.modified), self.now, source.ttl),
            _ => Freshness::Missing,
        };
        let action = decide(state, self.flags);

        if let Ok(Some(blob)) = &cached {
            debug!(
                catalog = %source.name,
                age = %format_duration(snapshot_age(blob.modified, self.now).as_secs()),
                ?state,
                ?action,
                "Checked price snapshot"
            );
        } else {
            debug!(catalog = %source.name, ?state, ?action, "Checked price snapshot");
        }

        if action == Action::UseCache {
            match decode_snapshot(cached) {
                Ok(catalog) => return Ok(catalog),
                Err(reason) if self.flags.skip_download => {
                    return Err(FleetError::CacheUnusable {
                        catalog: source.name.clone(),
                        reason,
                    });
                }
                Err(reason) => {
                    info!("Price snapshot {} unusable ({}), downloading", source.name, reason);
                }
            }
        }

        self.refresh(source, ingest).await
    }

    async fn refresh<T, F>(&self, source: &CatalogSource, ingest: F) -> Result<T>
    where
        T: Serialize,
        F: Fn(&[u8]) -> Result<T>,
    {
        info!("Price snapshot {} out of date, fetching new data", source.name);
        let bytes = self.fetcher.fetch(&source.url).await?;
        let catalog = ingest(&bytes)?;

        match serde_json::to_vec(&catalog) {
            Ok(snapshot) => {
                if let Err(e) = self.store.write(&source.name, &snapshot) {
                    warn!("Failed to write price snapshot {}: {}", source.name, e);
                }
            }
            Err(e) => warn!("Failed to serialize price snapshot {}: {}", source.name, e),
        }

        Ok(catalog)
    }
}

fn decode_snapshot<T: DeserializeOwned>(
    cached: Result<Option<StoredBlob>>,
) -> std::result::Result<T, String> {
    match cached {
        Ok(Some(blob)) => serde_json::from_slice(&blob.bytes)
            .map_err(|e| format!("snapshot does not decode: {}", e)),
        Ok(None) => Err("no snapshot stored".to_string()),
        Err(e) => Err(format!("snapshot could not be read: {}", e)),
    }
}
