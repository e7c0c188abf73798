//! Concurrent map from request identity to its pending record.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::correlation::record::{PendingRecord, RequestId};

/// Errors raised when pipeline stages fire out of order.
///
/// Both variants indicate a programming error in the host pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    /// `begin` was called twice for the same identity.
    #[error("request {0} is already being tracked")]
    DuplicateKey(RequestId),

    /// A stage fired for an identity with no matching `begin`.
    #[error("no pending record for request {0}")]
    UnknownKey(RequestId),
}

/// Thread-safe store of in-flight request records.
///
/// Cloning is cheap and yields a handle onto the same map.
#[derive(Debug, Clone, Default)]
pub struct CorrelationStore {
    records: Arc<DashMap<RequestId, PendingRecord>>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the pending record for `id`.
    pub fn begin(&self, id: RequestId) -> Result<(), CorrelationError> {
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(CorrelationError::DuplicateKey(id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingRecord::new(id));
                Ok(())
            }
        }
    }

    /// Copy of the current record for `id`.
    pub fn get(&self, id: RequestId) -> Result<PendingRecord, CorrelationError> {
        self.records
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(CorrelationError::UnknownKey(id))
    }

    /// Mutate the record for `id` while holding its shard lock.
    ///
    /// The closure must not call back into the store.
    pub fn update<R>(
        &self,
        id: RequestId,
        f: impl FnOnce(&mut PendingRecord) -> R,
    ) -> Result<R, CorrelationError> {
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(CorrelationError::UnknownKey(id))?;
        Ok(f(record.value_mut()))
    }

    /// Remove the record for `id` and hand it back.
    pub fn finalize(&self, id: RequestId) -> Result<PendingRecord, CorrelationError> {
        self.records
            .remove(&id)
            .map(|(_, record)| record)
            .ok_or(CorrelationError::UnknownKey(id))
    }

    /// Number of in-flight records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::record::CaughtError;

    #[test]
    fn test_begin_finalize() {
        let store = CorrelationStore::new();
        let id = RequestId::new();

        store.begin(id).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.begin(id), Err(CorrelationError::DuplicateKey(id)));

        let record = store.finalize(id).unwrap();
        assert_eq!(record.request_id(), id);
        assert!(store.is_empty());

        // Reading after finalize is a correlation bug
        assert_eq!(store.get(id).unwrap_err(), CorrelationError::UnknownKey(id));
        assert_eq!(store.finalize(id).unwrap_err(), CorrelationError::UnknownKey(id));
    }

    #[test]
    fn test_update_unknown() {
        let store = CorrelationStore::new();
        let id = RequestId::new();
        let result = store.update(id, |r| r.set_caught_error(CaughtError::new("E", "")));
        assert_eq!(result, Err(CorrelationError::UnknownKey(id)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_requests() {
        let store = CorrelationStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let id = RequestId::new();
                        store.begin(id).unwrap();
                        store
                            .update(id, |r| r.set_caught_error(CaughtError::new("E", "")))
                            .unwrap();
                        let record = store.finalize(id).unwrap();
                        assert!(record.caught_error().is_some());
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert!(store.is_empty());
    }
}
