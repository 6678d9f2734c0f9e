/// Record Storage System
///
/// Durable key-value storage for drop records. The contract is modeled
/// on an eventually-consistent KV namespace: point reads and writes by
/// key, plus a prefix-scoped key scan with continuation cursors. No
/// read-after-write guarantee is promised to the scan.

pub mod sqlite;
pub mod store;

pub use store::RecordStore;

use crate::error::DropResult;
use async_trait::async_trait;

/// One page of a prefix scan
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    /// Opaque continuation cursor; `None` when the scan is exhausted
    pub cursor: Option<String>,
}

/// Record storage backend trait
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Point read by key
    async fn get(&self, key: &str) -> DropResult<Option<String>>;

    /// Write a value under a key, replacing any existing value
    async fn put(&self, key: &str, value: &str) -> DropResult<()>;

    /// List up to `limit` keys under `prefix`, starting after `cursor`
    async fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> DropResult<KeyPage>;
}
