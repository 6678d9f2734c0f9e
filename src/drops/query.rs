/// Drop Query Service — the read path
///
/// Scans the per-record keyspace page by page, fetches record bodies in
/// bounded concurrent batches, merges any legacy aggregate records for
/// backward compatibility, and filters by visitor when asked.
use crate::{
    drops::models::Drop,
    error::DropResult,
    record_store::RecordStore,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use tracing::warn;

/// Keys fetched per scan page
const SCAN_PAGE_LIMIT: usize = 1000;

/// Record bodies fetched concurrently at a time; bounds connections and
/// memory while still parallelizing I/O
const FETCH_BATCH_SIZE: usize = 50;

/// Main drop query service
#[derive(Clone)]
pub struct DropQueryService {
    record_store: RecordStore,
}

impl DropQueryService {
    pub fn new(record_store: RecordStore) -> Self {
        Self { record_store }
    }

    /// List all drops, optionally restricted to one visitor.
    ///
    /// Storage failures during the scan surface as errors so callers can
    /// tell "no drops yet" from "storage unavailable"; legacy-layout
    /// failures are swallowed because that path is best-effort only.
    pub async fn list_drops(&self, visitor_filter: Option<&str>) -> DropResult<Vec<Drop>> {
        let mut drops = self.scan_current_layout().await?;

        let seen: HashSet<String> = drops.iter().map(|d| d.id.clone()).collect();
        for legacy in self.read_legacy_layout().await {
            if !seen.contains(&legacy.id) {
                drops.push(legacy);
            }
        }

        if let Some(visitor) = visitor_filter {
            drops.retain(|d| d.visitor_id == visitor);
        }

        // Stable order: oldest first, id as tiebreak
        drops.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(drops)
    }

    /// Walk the prefix scan to exhaustion, fetching bodies in batches
    async fn scan_current_layout(&self) -> DropResult<Vec<Drop>> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .record_store
                .list_drop_keys(cursor.as_deref(), SCAN_PAGE_LIMIT)
                .await?;
            keys.extend(page.keys);
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let bodies: Vec<Option<String>> = stream::iter(keys)
            .map(|key| {
                let store = self.record_store.clone();
                async move { store.get(&key).await }
            })
            .buffered(FETCH_BATCH_SIZE)
            .try_collect()
            .await?;

        let mut drops = Vec::with_capacity(bodies.len());
        for body in bodies.into_iter().flatten() {
            match serde_json::from_str::<Drop>(&body) {
                Ok(drop) => drops.push(drop),
                Err(e) => warn!("Skipping undecodable drop record: {}", e),
            }
        }
        Ok(drops)
    }

    /// Best-effort read of the legacy aggregate key; anything that goes
    /// wrong here is logged and ignored.
    async fn read_legacy_layout(&self) -> Vec<Drop> {
        let raw = match self.record_store.get_legacy().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Legacy drops read failed, ignoring: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Drop>>(&raw) {
            Ok(drops) => drops,
            Err(e) => {
                warn!("Legacy drops value undecodable, ignoring: {}", e);
                Vec::new()
            }
        }
    }
}
