//! Routines written as async bodies.
//!
//! ```ignore
//! let routine = Coroutine::new(|co| async move {
//!     let n = co.yield_(json!({"type": "RETURN_TWO"})).await?;
//!     co.yield_(json!({"type": "CHANGE", "nextState": n})).await?;
//!     Ok(Value::Null)
//! });
//! ```
//!
//! The body is polled by hand with a no-op waker. Each `co.yield_` parks its
//! value in a shared slot and stays pending until the runtime resumes the
//! coroutine with the answer. The body must not await anything else: the
//! runtime is the only thing that can wake it. Only one yield may be
//! outstanding at a time; yielding again before the first is answered (for
//! example under `join!`) fails the routine with `ConcurrentYield`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use serde_json::Value;

use crate::error::RoutineError;
use crate::routine::{Resume, Routine, Step};

#[derive(Default)]
struct Slot {
    outgoing: Option<Value>,
    incoming: Option<Resume>,
    /// A yield has parked its value and not yet received an answer.
    in_flight: bool,
    overlapped: bool,
}

/// Handle a coroutine body uses to yield.
#[derive(Clone)]
pub struct Co {
    slot: Arc<Mutex<Slot>>,
}

impl Co {
    /// Suspend on `value`. Resolves to the value the runtime resumes with,
    /// or to the error it throws in.
    pub fn yield_(&self, value: impl Into<Value>) -> Yield {
        Yield {
            slot: self.slot.clone(),
            value: Some(value.into()),
        }
    }
}

/// Future returned by [`Co::yield_`].
pub struct Yield {
    slot: Arc<Mutex<Slot>>,
    value: Option<Value>,
}

impl Future for Yield {
    type Output = Result<Value, RoutineError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut slot = lock(&this.slot);
        if let Some(value) = this.value.take() {
            if slot.in_flight {
                slot.overlapped = true;
            } else {
                slot.outgoing = Some(value);
                slot.in_flight = true;
            }
            return Poll::Pending;
        }
        if slot.overlapped {
            return Poll::Pending;
        }
        let answer = match slot.incoming.take() {
            Some(Resume::Next(value)) => Ok(value),
            Some(Resume::Throw(err)) => Err(err),
            None => return Poll::Pending,
        };
        slot.in_flight = false;
        Poll::Ready(answer)
    }
}

/// A [`Routine`] backed by an async body.
pub struct Coroutine {
    slot: Arc<Mutex<Slot>>,
    body: Option<BoxFuture<'static, Result<Value, RoutineError>>>,
    started: bool,
}

impl Coroutine {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = Result<Value, RoutineError>> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Slot::default()));
        let co = Co { slot: slot.clone() };
        Self {
            slot,
            body: Some(body(co).boxed()),
            started: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.body.is_none()
    }
}

impl Routine for Coroutine {
    fn resume(&mut self, input: Resume) -> Result<Step, RoutineError> {
        let Some(body) = self.body.as_mut() else {
            return Err(RoutineError::Finished);
        };

        // Like a generator, the first resume value has nowhere to go.
        if self.started {
            lock(&self.slot).incoming = Some(input);
        }
        self.started = true;

        let mut cx = Context::from_waker(noop_waker_ref());
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.body = None;
                result.map(Step::Complete)
            }
            Poll::Pending => {
                let mut slot = lock(&self.slot);
                if slot.overlapped {
                    drop(slot);
                    self.body = None;
                    return Err(RoutineError::ConcurrentYield);
                }
                match slot.outgoing.take() {
                    Some(value) => Ok(Step::Yield(value)),
                    None => {
                        drop(slot);
                        self.body = None;
                        Err(RoutineError::ForeignAwait)
                    }
                }
            }
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> std::sync::MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}
