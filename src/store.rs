//! Record store seam.
//!
//! The analytics engine never stores anything; the query layer asks a
//! `RecordStore` for a user's full observation set and hands it over.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::models::Observation;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Internal lock failed")]
    LockFailed,
}

/// Supplies normalized observations per user.
pub trait RecordStore: Send + Sync {
    /// Every observation recorded for `user_id`, in no particular order.
    fn observations_for(&self, user_id: &str) -> Result<Vec<Observation>, StoreError>;

    /// Append already-normalized observations. Returns the user's new total.
    fn append(&self, user_id: &str, observations: Vec<Observation>) -> Result<usize, StoreError>;
}

/// In-memory store backed by RwLock. Contents live for the process lifetime.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, Vec<Observation>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn observations_for(&self, user_id: &str) -> Result<Vec<Observation>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockFailed)?;
        Ok(records.get(user_id).cloned().unwrap_or_default())
    }

    fn append(&self, user_id: &str, observations: Vec<Observation>) -> Result<usize, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockFailed)?;
        let entry = records.entry(user_id.to_string()).or_default();
        entry.extend(observations);
        tracing::debug!(user = user_id, total = entry.len(), "Observations appended");
        Ok(entry.len())
    }
}
