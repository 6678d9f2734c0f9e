/// Record Store Manager
///
/// Owns the key layout for drop records on top of a `RecordBackend`:
/// one key per record under a common prefix (current layout), plus one
/// optional legacy aggregate key holding a JSON array of older records.
/// New writes only ever target the per-id layout; the legacy key is
/// read-only compatibility.
use crate::{
    error::DropResult,
    record_store::{KeyPage, RecordBackend},
};
use std::sync::Arc;

/// Prefix for per-record keys in the current layout
pub const DROP_KEY_PREFIX: &str = "drop:";

/// Aggregate key of the legacy layout (one big JSON array)
pub const LEGACY_DROPS_KEY: &str = "drops";

/// Main record store manager
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self { backend }
    }

    /// Storage key for a drop id
    pub fn drop_key(id: &str) -> String {
        format!("{}{}", DROP_KEY_PREFIX, id)
    }

    /// Persist a serialized drop record under its own key.
    ///
    /// Each drop owns a unique key, so concurrent writers never contend
    /// on shared state; there is no read-modify-write here.
    pub async fn put_drop(&self, id: &str, json: &str) -> DropResult<()> {
        self.backend.put(&Self::drop_key(id), json).await
    }

    /// Read one serialized drop record by storage key
    pub async fn get(&self, key: &str) -> DropResult<Option<String>> {
        self.backend.get(key).await
    }

    /// One page of drop-record keys
    pub async fn list_drop_keys(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> DropResult<KeyPage> {
        self.backend.list(DROP_KEY_PREFIX, cursor, limit).await
    }

    /// Read the legacy aggregate value, if any
    pub async fn get_legacy(&self) -> DropResult<Option<String>> {
        self.backend.get(LEGACY_DROPS_KEY).await
    }
}
