//! Generator-style action runtime.
//!
//! A routine yields actions. Each yield is routed through a control table
//! keyed by action `type`; the matching control's result (or error) is fed
//! back into the routine at the point of the yield. Actions no control
//! claims, and the routine's action-shaped final value, go to a dispatch
//! sink supplied by the caller.
//!
//! A control that returns [`ControlOutcome::Halt`] kills the routine: it is
//! never resumed and its invocation never settles.

pub mod action;
pub mod control;
pub mod coroutine;
pub mod dispatch;
pub mod error;
pub mod routine;
pub mod runtime;

pub use action::{action, action_type, is_action, is_action_of_type};
pub use control::{Control, ControlOutcome, ControlTable};
pub use coroutine::{Co, Coroutine};
pub use dispatch::{Dispatch, DispatchedAction, MemoryDispatch};
pub use error::RoutineError;
pub use routine::{Resume, Routine, Script, Step};
pub use runtime::{Input, Invocation, Outcome, RoutineStatus, Runtime};
