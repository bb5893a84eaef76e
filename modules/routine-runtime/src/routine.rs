//! The routine protocol.
//!
//! A routine is a resumable computation. The runtime drives it by calling
//! [`Routine::resume`] until it completes, fails, or is killed. The first
//! call always passes `Resume::Next(Value::Null)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RoutineError;

/// What the runtime injects at a suspension point.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    Next(Value),
    Throw(RoutineError),
}

/// What a routine produces when resumed.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Suspended on a value. Actions are routed; anything else is skipped.
    Yield(Value),
    /// Finished with a final value.
    Complete(Value),
}

/// A resumable computation. `Err` means the routine threw and did not catch.
pub trait Routine: Send {
    fn resume(&mut self, input: Resume) -> Result<Step, RoutineError>;
}

impl<R: Routine + ?Sized> Routine for Box<R> {
    fn resume(&mut self, input: Resume) -> Result<Step, RoutineError> {
        (**self).resume(input)
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// A routine described as data: yield each step in order, then complete
/// with `returns`.
///
/// Every value the runtime resumes the script with is kept in `received`.
/// Thrown errors are not caught.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(default)]
    pub returns: Value,
    #[serde(skip)]
    received: Vec<Value>,
    #[serde(skip)]
    cursor: usize,
    #[serde(skip)]
    finished: bool,
}

impl Script {
    pub fn new(steps: Vec<Value>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub fn returning(mut self, value: Value) -> Self {
        self.returns = value;
        self
    }

    pub fn from_json(source: &str) -> Result<Self, RoutineError> {
        serde_json::from_str(source).map_err(|e| RoutineError::Script(e.to_string()))
    }

    /// Values injected at each completed yield, in order.
    pub fn received(&self) -> &[Value] {
        &self.received
    }
}

impl Routine for Script {
    fn resume(&mut self, input: Resume) -> Result<Step, RoutineError> {
        if self.finished {
            return Err(RoutineError::Finished);
        }

        // The first resume has no yield to answer.
        if self.cursor > 0 {
            match input {
                Resume::Next(value) => self.received.push(value),
                Resume::Throw(err) => {
                    self.finished = true;
                    return Err(err);
                }
            }
        }

        match self.steps.get(self.cursor) {
            Some(step) => {
                self.cursor += 1;
                Ok(Step::Yield(step.clone()))
            }
            None => {
                self.finished = true;
                Ok(Step::Complete(self.returns.clone()))
            }
        }
    }
}
