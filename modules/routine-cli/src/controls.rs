//! Demo controls for the CLI.
//!
//! - `DELAY {ms}`: sleeps, resumes with `null`.
//! - `ECHO {value}`: resumes with `value` immediately.
//! - `FAIL {message}`: throws `message` into the routine.
//! - `HALT`: kills the routine.

use std::time::Duration;

use anyhow::bail;
use routine_runtime::control::{from_fn, halting, resolving, returning};
use routine_runtime::ControlTable;
use serde_json::Value;
use tracing::info;

use crate::config::Config;

pub fn demo_controls(config: &Config) -> ControlTable {
    let scale = config.delay_scale;
    ControlTable::new()
        .with(
            "DELAY",
            resolving(move |action| {
                let ms = action["ms"].as_u64().unwrap_or(0).saturating_mul(scale);
                async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(Value::Null)
                }
            }),
        )
        .with("ECHO", returning(|action| action["value"].clone()))
        .with(
            "FAIL",
            from_fn(|action| {
                let message = action["message"].as_str().unwrap_or("FAIL control invoked");
                bail!("{message}")
            }),
        )
        .with(
            "HALT",
            halting(|action| info!(reason = action["reason"].as_str(), "Halting routine")),
        )
}
