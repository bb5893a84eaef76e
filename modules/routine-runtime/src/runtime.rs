//! The routine interpreter.
//!
//! Step → match control → resume → repeat until the routine completes.
//! Unmatched actions and the action-shaped final value go to the dispatch
//! sink. Everything up to the first pending control future runs inside
//! [`Runtime::run`] itself, so a routine answered only by synchronous
//! controls is already settled when `run` returns.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::action::{action_type, is_action};
use crate::control::{ControlOutcome, ControlTable};
use crate::coroutine::Coroutine;
use crate::dispatch::Dispatch;
use crate::error::RoutineError;
use crate::routine::{Resume, Routine, Script, Step};

/// What the runtime accepts: a plain action or a routine to drive.
pub enum Input {
    Action(Value),
    Routine(Box<dyn Routine>),
}

impl Input {
    pub fn routine(routine: impl Routine + 'static) -> Self {
        Self::Routine(Box::new(routine))
    }
}

impl From<Value> for Input {
    fn from(action: Value) -> Self {
        Self::Action(action)
    }
}

impl From<Box<dyn Routine>> for Input {
    fn from(routine: Box<dyn Routine>) -> Self {
        Self::Routine(routine)
    }
}

impl From<Coroutine> for Input {
    fn from(routine: Coroutine) -> Self {
        Self::routine(routine)
    }
}

impl From<Script> for Input {
    fn from(routine: Script) -> Self {
        Self::routine(routine)
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Routine(_) => f.write_str("Routine(..)"),
        }
    }
}

/// Drives routines against a fixed control table and dispatch sink.
///
/// Cheap to clone; clones share the table and the sink.
#[derive(Clone)]
pub struct Runtime {
    controls: Arc<ControlTable>,
    dispatch: Arc<dyn Dispatch>,
}

impl Runtime {
    pub fn new(controls: ControlTable, dispatch: impl Dispatch + 'static) -> Self {
        Self::from_shared(Arc::new(controls), Arc::new(dispatch))
    }

    pub fn from_shared(controls: Arc<ControlTable>, dispatch: Arc<dyn Dispatch>) -> Self {
        Self { controls, dispatch }
    }

    pub fn controls(&self) -> &ControlTable {
        &self.controls
    }

    /// Run a plain action or a routine.
    ///
    /// A plain action is dispatched right away, without consulting the
    /// control table, and the invocation settles with it. A routine is
    /// stepped until it completes, fails, is killed, or waits on a control
    /// future.
    pub fn run(&self, input: impl Into<Input>) -> Invocation {
        let run_id = Uuid::new_v4();
        let state = match input.into() {
            Input::Action(action) => {
                if is_action(&action) {
                    self.forward(run_id, action.clone());
                }
                State::Settled(Ok(action))
            }
            Input::Routine(routine) => {
                trace!(%run_id, "Starting routine");
                self.advance(run_id, routine, Resume::Next(Value::Null))
            }
        };

        Invocation {
            runtime: self.clone(),
            run_id,
            state,
        }
    }

    /// An invocation that is already settled with `value`. Nothing is
    /// dispatched.
    pub fn resolved(&self, value: Value) -> Invocation {
        Invocation {
            runtime: self.clone(),
            run_id: Uuid::new_v4(),
            state: State::Settled(Ok(value)),
        }
    }

    /// Step `routine` until it needs to wait or reaches a terminal state.
    fn advance(&self, run_id: Uuid, mut routine: Box<dyn Routine>, mut input: Resume) -> State {
        loop {
            let value = match routine.resume(input) {
                Ok(Step::Yield(value)) => value,
                Ok(Step::Complete(value)) => {
                    if is_action(&value) {
                        self.forward(run_id, value.clone());
                    }
                    debug!(%run_id, "Routine completed");
                    return State::Settled(Ok(value));
                }
                Err(err) => {
                    warn!(%run_id, error = %err, "Routine failed");
                    return State::Settled(Err(err));
                }
            };

            let Some((action_type, control)) = self.controls.find(&value) else {
                if is_action(&value) {
                    self.forward(run_id, value);
                } else {
                    trace!(%run_id, "Skipping non-action yield");
                }
                input = Resume::Next(Value::Null);
                continue;
            };

            debug!(%run_id, action_type, "Control matched");
            input = match control.handle(&value) {
                Ok(ControlOutcome::Value(result)) => Resume::Next(result),
                Ok(ControlOutcome::Future(pending)) => {
                    return State::Suspended {
                        routine,
                        action_type: action_type.to_string(),
                        pending,
                    };
                }
                Ok(ControlOutcome::Halt) => {
                    warn!(%run_id, action_type, "Control halted routine; it will never resume");
                    return State::Killed;
                }
                Err(err) => {
                    debug!(%run_id, action_type, error = %err, "Control failed");
                    Resume::Throw(RoutineError::control(action_type, err))
                }
            };
        }
    }

    fn forward(&self, run_id: Uuid, action: Value) {
        debug!(
            %run_id,
            action_type = action_type(&action).unwrap_or_default(),
            "Dispatching action"
        );
        self.dispatch.dispatch(action);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("controls", &self.controls)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Observable lifecycle of an [`Invocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStatus {
    /// Waiting on a control future.
    Suspended,
    /// Finished, failed, or already consumed.
    Settled,
    /// A control halted the routine. The invocation will never settle.
    Killed,
}

enum State {
    Suspended {
        routine: Box<dyn Routine>,
        action_type: String,
        pending: BoxFuture<'static, anyhow::Result<Value>>,
    },
    Settled(Result<Value, RoutineError>),
    Killed,
    Consumed,
}

/// One run of the runtime. Resolves to the routine's final value or to the
/// error it failed with.
///
/// A killed invocation stays pending forever. Dropping an invocation drops
/// the routine and any control future it was waiting on.
#[must_use = "an invocation does nothing after its synchronous prefix unless polled"]
pub struct Invocation {
    runtime: Runtime,
    run_id: Uuid,
    state: State,
}

impl Invocation {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn status(&self) -> RoutineStatus {
        match self.state {
            State::Suspended { .. } => RoutineStatus::Suspended,
            State::Settled(_) | State::Consumed => RoutineStatus::Settled,
            State::Killed => RoutineStatus::Killed,
        }
    }

    pub fn is_killed(&self) -> bool {
        self.status() == RoutineStatus::Killed
    }

    /// The action type of the control this invocation is waiting on.
    pub fn waiting_on(&self) -> Option<&str> {
        match &self.state {
            State::Suspended { action_type, .. } => Some(action_type),
            _ => None,
        }
    }

    /// Like awaiting the invocation, but reports a kill instead of staying
    /// pending forever.
    pub async fn outcome(mut self) -> Outcome {
        std::future::poll_fn(|cx| match Pin::new(&mut self).poll(cx) {
            Poll::Ready(result) => Poll::Ready(Outcome::Settled(result)),
            Poll::Pending if self.is_killed() => Poll::Ready(Outcome::Killed),
            Poll::Pending => Poll::Pending,
        })
        .await
    }
}

/// Result of [`Invocation::outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Settled(Result<Value, RoutineError>),
    Killed,
}

impl Future for Invocation {
    type Output = Result<Value, RoutineError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.state, State::Consumed) {
                State::Settled(result) => return Poll::Ready(result),
                State::Killed => {
                    this.state = State::Killed;
                    return Poll::Pending;
                }
                State::Consumed => panic!("invocation polled after completion"),
                State::Suspended {
                    routine,
                    action_type,
                    mut pending,
                } => match pending.as_mut().poll(cx) {
                    Poll::Pending => {
                        this.state = State::Suspended {
                            routine,
                            action_type,
                            pending,
                        };
                        return Poll::Pending;
                    }
                    Poll::Ready(outcome) => {
                        let resume = match outcome {
                            Ok(value) => Resume::Next(value),
                            Err(err) => {
                                debug!(
                                    run_id = %this.run_id,
                                    action_type = action_type.as_str(),
                                    error = %err,
                                    "Control rejected"
                                );
                                Resume::Throw(RoutineError::rejected(&action_type, err))
                            }
                        };
                        this.state = this.runtime.advance(this.run_id, routine, resume);
                    }
                },
            }
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("run_id", &self.run_id)
            .field("status", &self.status())
            .finish()
    }
}
