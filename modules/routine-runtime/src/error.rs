use thiserror::Error;

/// Errors that travel through a routine.
///
/// Control failures are injected into the routine before they can surface,
/// so the type is `Clone` and carries flattened messages rather than sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    #[error("control `{action_type}` failed: {message}")]
    Control {
        action_type: String,
        message: String,
    },

    #[error("control `{action_type}` rejected: {message}")]
    Rejected {
        action_type: String,
        message: String,
    },

    #[error("{0}")]
    Raised(String),

    #[error("routine awaited something other than a yield")]
    ForeignAwait,

    #[error("routine yielded again before its previous yield was answered")]
    ConcurrentYield,

    #[error("routine resumed after it finished")]
    Finished,

    #[error("invalid script: {0}")]
    Script(String),
}

impl RoutineError {
    /// An error raised by routine code itself.
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    pub(crate) fn control(action_type: &str, err: anyhow::Error) -> Self {
        Self::Control {
            action_type: action_type.to_string(),
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn rejected(action_type: &str, err: anyhow::Error) -> Self {
        Self::Rejected {
            action_type: action_type.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// The action type of the control that produced this error, if any.
    pub fn action_type(&self) -> Option<&str> {
        match self {
            Self::Control { action_type, .. } | Self::Rejected { action_type, .. } => {
                Some(action_type)
            }
            _ => None,
        }
    }
}
