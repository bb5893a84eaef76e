//! Dispatch sinks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Receives actions that no control claims, plus the action-shaped final
/// value of every completed routine. Return values are ignored.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: Value);
}

/// Adapter turning a closure into a [`Dispatch`].
pub struct FnDispatch<F>(F);

impl<F> Dispatch for FnDispatch<F>
where
    F: Fn(Value) + Send + Sync,
{
    fn dispatch(&self, action: Value) {
        (self.0)(action)
    }
}

pub fn from_fn<F>(f: F) -> FnDispatch<F>
where
    F: Fn(Value) + Send + Sync,
{
    FnDispatch(f)
}

// ---------------------------------------------------------------------------
// MemoryDispatch (tests, CLI output)
// ---------------------------------------------------------------------------

/// One action as seen by a [`MemoryDispatch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchedAction {
    pub seq: i64,
    pub ts: DateTime<Utc>,
    pub action: Value,
}

/// In-memory recording sink. Clones share the same log, so a test can hand
/// one clone to the runtime and assert against another.
#[derive(Clone, Default)]
pub struct MemoryDispatch {
    next_seq: Arc<AtomicI64>,
    records: Arc<Mutex<Vec<DispatchedAction>>>,
}

impl MemoryDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dispatched actions, in order.
    pub fn actions(&self) -> Vec<Value> {
        self.lock().iter().map(|r| r.action.clone()).collect()
    }

    /// Full records including sequence numbers and timestamps.
    pub fn records(&self) -> Vec<DispatchedAction> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DispatchedAction>> {
        // Append-only: a poisoned log is still consistent.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Dispatch for MemoryDispatch {
    fn dispatch(&self, action: Value) {
        // Sequence under the lock so the log stays ordered by `seq`.
        let mut records = self.lock();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        records.push(DispatchedAction {
            seq,
            ts: Utc::now(),
            action,
        });
    }
}
