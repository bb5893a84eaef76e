//! Reducer store with the routine middleware in front of it.
//!
//! Plain actions go straight to the reducer. Routines go through a
//! [`Runtime`] whose dispatch sink is this same store, so every action a
//! routine forwards (and its action-shaped final value) is reduced too.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use routine_runtime::{is_action, ControlTable, Dispatch, Input, Invocation, Runtime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::reducer::Reducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

struct Inner<S> {
    state: Mutex<S>,
    reducer: Box<dyn Reducer<S>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_listener: AtomicU64,
    runtime: Runtime,
}

impl<S> Inner<S>
where
    S: Clone + PartialEq + Send + 'static,
{
    fn apply(&self, action: &Value) {
        if !is_action(action) {
            warn!("Ignoring non-action dispatched to store");
            return;
        }

        let changed = {
            let mut state = lock(&self.state);
            let before = state.clone();
            self.reducer.reduce(&mut state, action);
            *state != before
        };

        if !changed {
            return;
        }

        // Listeners run without any store lock held so they can read state
        // or dispatch again.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        debug!(listeners = listeners.len(), "State changed");
        for listener in listeners {
            listener();
        }
    }
}

/// Dispatch sink handed to the runtime. Holds the store weakly so the
/// runtime inside the store does not keep the store alive.
struct StoreDispatch<S> {
    inner: Weak<Inner<S>>,
}

impl<S> Dispatch for StoreDispatch<S>
where
    S: Clone + PartialEq + Send + 'static,
{
    fn dispatch(&self, action: Value) {
        match self.inner.upgrade() {
            Some(inner) => inner.apply(&action),
            None => debug!("Store dropped; discarding routine action"),
        }
    }
}

/// A reducer store fronted by the routine middleware.
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> Store<S>
where
    S: Clone + PartialEq + Send + 'static,
{
    pub fn new(reducer: impl Reducer<S> + 'static, initial_state: S, controls: ControlTable) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner<S>>| Inner {
            state: Mutex::new(initial_state),
            reducer: Box::new(reducer),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            runtime: Runtime::new(
                controls,
                StoreDispatch {
                    inner: weak.clone(),
                },
            ),
        });
        Self { inner }
    }

    /// Dispatch a plain action or run a routine.
    ///
    /// A plain action is reduced immediately and the returned invocation is
    /// already settled with it. A routine is handed to the runtime.
    pub fn dispatch(&self, input: impl Into<Input>) -> Invocation {
        match input.into() {
            Input::Action(action) => {
                self.inner.apply(&action);
                self.inner.runtime.resolved(action)
            }
            routine => self.inner.runtime.run(routine),
        }
    }

    /// A snapshot of the current state.
    pub fn get_state(&self) -> S {
        lock(&self.inner.state).clone()
    }

    /// Register a listener called after every dispatch that changes state.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_listener.fetch_add(1, Ordering::SeqCst));
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*lock(&self.inner.state))
            .field("controls", self.inner.runtime.controls())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::from_fn;
    use serde_json::json;

    fn counter() -> Store<i64> {
        Store::new(
            from_fn(|count: &mut i64, action: &Value| {
                if action["type"] == "ADD" {
                    *count += action["by"].as_i64().unwrap_or(1);
                }
            }),
            0,
            ControlTable::new(),
        )
    }

    #[test]
    fn plain_action_is_reduced() {
        let store = counter();
        let _ = store.dispatch(json!({"type": "ADD", "by": 2}));
        assert_eq!(store.get_state(), 2);
    }

    #[test]
    fn non_action_leaves_state_alone() {
        let store = counter();
        let _ = store.dispatch(json!(5));
        assert_eq!(store.get_state(), 0);
    }

    #[test]
    fn dropped_store_discards_forwarded_actions() {
        let store = counter();
        let runtime = store.runtime().clone();
        drop(store);

        // The runtime outlives the store; forwarding just becomes a no-op.
        let _ = runtime.run(json!({"type": "ADD"}));
    }

    #[test]
    fn unsubscribe_reports_unknown_ids() {
        let store = counter();
        let id = store.subscribe(|| {});
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
    }
}
