//! Registry of in-flight parameter calls, keyed by request id.
//!
//! The promise for a call is owned by its completion closure; the registry
//! only records what is outstanding so callers and tests can inspect it.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering::AcqRel},
    time::{Duration, Instant},
};

use parking_lot::Mutex;

pub type RequestId = u64;

/// Snapshot of one outstanding call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub id: RequestId,
    pub operation: &'static str,
    pub service: String,
    pub issued_at: Instant,
}

impl PendingCall {
    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }
}

#[derive(Debug)]
pub struct PendingCallRegistry {
    // Start at 1 for ROS compatibility with sequence numbers
    next_id: AtomicU64,
    calls: Mutex<BTreeMap<RequestId, PendingCall>>,
}

impl Default for PendingCallRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            calls: Mutex::new(BTreeMap::new()),
        }
    }
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id and record the call as outstanding.
    pub fn register(&self, operation: &'static str, service: &str) -> RequestId {
        let id = self.next_id.fetch_add(1, AcqRel);
        let call = PendingCall {
            id,
            operation,
            service: service.to_string(),
            issued_at: Instant::now(),
        };
        self.calls.lock().insert(id, call);
        id
    }

    /// Remove a call once its promise has been fulfilled.
    pub fn complete(&self, id: RequestId) -> Option<PendingCall> {
        self.calls.lock().remove(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.calls.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Outstanding calls, oldest first.
    pub fn snapshot(&self) -> Vec<PendingCall> {
        self.calls.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let registry = PendingCallRegistry::new();
        let a = registry.register("get_parameters", "node__get_parameters");
        let b = registry.register("list_parameters", "node__list_parameters");
        assert_eq!(a, 1);
        assert!(b > a);

        let ops: Vec<_> = registry.snapshot().iter().map(|c| c.operation).collect();
        assert_eq!(ops, ["get_parameters", "list_parameters"]);
    }

    #[test]
    fn test_complete_removes_once() {
        let registry = PendingCallRegistry::new();
        let id = registry.register("set_parameters", "node__set_parameters");
        assert!(registry.contains(id));

        let call = registry.complete(id).unwrap();
        assert_eq!(call.service, "node__set_parameters");
        assert!(registry.complete(id).is_none());
        assert!(registry.is_empty());
    }
}
