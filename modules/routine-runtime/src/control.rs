//! Controls and the control table.
//!
//! A control is bound to one action type. When a routine yields an action of
//! that type the control runs and its outcome decides how the routine is
//! resumed:
//!
//! - [`ControlOutcome::Value`] resumes immediately with the value.
//! - [`ControlOutcome::Future`] suspends until the future settles.
//! - [`ControlOutcome::Halt`] kills the routine. It is never resumed.
//! - An `Err` from [`Control::handle`] is thrown into the routine.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::action::action_type;

/// What a control hands back to the runtime.
pub enum ControlOutcome {
    Value(Value),
    Future(BoxFuture<'static, Result<Value>>),
    Halt,
}

impl ControlOutcome {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::Future(future.boxed())
    }
}

impl fmt::Debug for ControlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Future(_) => f.write_str("Future(..)"),
            Self::Halt => f.write_str("Halt"),
        }
    }
}

/// Handler for one action type.
pub trait Control: Send + Sync {
    fn handle(&self, action: &Value) -> Result<ControlOutcome>;
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

pub struct FnControl<F>(F);

impl<F> Control for FnControl<F>
where
    F: Fn(&Value) -> Result<ControlOutcome> + Send + Sync,
{
    fn handle(&self, action: &Value) -> Result<ControlOutcome> {
        (self.0)(action)
    }
}

/// Full control over the outcome, including synchronous failure.
pub fn from_fn<F>(f: F) -> FnControl<F>
where
    F: Fn(&Value) -> Result<ControlOutcome> + Send + Sync,
{
    FnControl(f)
}

/// A synchronous control. The routine resumes with the returned value.
pub fn returning<F>(f: F) -> impl Control
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    from_fn(move |action| Ok(ControlOutcome::Value(f(action))))
}

/// An asynchronous control. The routine suspends until the future settles.
pub fn resolving<F, Fut>(f: F) -> impl Control
where
    F: Fn(&Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    from_fn(move |action| Ok(ControlOutcome::future(f(action))))
}

/// A side-effect-only control that kills the routine after running.
pub fn halting<F>(f: F) -> impl Control
where
    F: Fn(&Value) + Send + Sync,
{
    from_fn(move |action| {
        f(action);
        Ok(ControlOutcome::Halt)
    })
}

// ---------------------------------------------------------------------------
// ControlTable
// ---------------------------------------------------------------------------

/// Ordered map from action type to control.
///
/// Registering a type twice replaces the earlier control in place, so the
/// table never holds duplicate keys.
#[derive(Clone, Default)]
pub struct ControlTable {
    entries: Vec<(String, Arc<dyn Control>)>,
}

impl ControlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, action_type: impl Into<String>, control: impl Control + 'static) -> Self {
        self.insert(action_type, control);
        self
    }

    pub fn insert(&mut self, action_type: impl Into<String>, control: impl Control + 'static) {
        self.insert_shared(action_type.into(), Arc::new(control));
    }

    fn insert_shared(&mut self, action_type: String, control: Arc<dyn Control>) {
        match self.entries.iter_mut().find(|(t, _)| *t == action_type) {
            Some(entry) => entry.1 = control,
            None => self.entries.push((action_type, control)),
        }
    }

    pub fn get(&self, action_type: &str) -> Option<&Arc<dyn Control>> {
        self.entries
            .iter()
            .find(|(t, _)| t == action_type)
            .map(|(_, c)| c)
    }

    /// The control for a yielded value. Non-actions never match.
    pub fn find(&self, value: &Value) -> Option<(&str, &Arc<dyn Control>)> {
        let wanted = action_type(value)?;
        self.entries
            .iter()
            .find(|(t, _)| t == wanted)
            .map(|(t, c)| (t.as_str(), c))
    }

    /// Add every entry of `other`. Entries in `other` win on conflict.
    pub fn merge(mut self, other: ControlTable) -> Self {
        for (action_type, control) in other.entries {
            self.insert_shared(action_type, control);
        }
        self
    }

    /// Registered action types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ControlTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types()).finish()
    }
}
