//! Minimal reducer store driven by the routine runtime.
//!
//! The store is the runtime's dispatch sink: actions a routine does not
//! handle through a control end up in the reducer.

pub mod reducer;
pub mod store;

pub use reducer::Reducer;
pub use store::{Store, SubscriptionId};
