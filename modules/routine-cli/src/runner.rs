use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use routine_runtime::{DispatchedAction, MemoryDispatch, Outcome, Runtime, Script};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::controls::demo_controls;

/// How a script run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResult {
    Completed { value: Value },
    Failed { error: String },
    Killed,
    TimedOut { after_ms: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dispatched: Vec<DispatchedAction>,
    pub result: RunResult,
}

pub fn load_script(source: &str) -> Result<Script> {
    Ok(Script::from_json(source)?)
}

/// Read a script from `path`, or from stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read script from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Run `script` against the demo controls, recording every dispatched action.
pub async fn run_script(script: Script, config: &Config, timeout: Option<Duration>) -> RunReport {
    let sink = MemoryDispatch::new();
    let runtime = Runtime::new(demo_controls(config), sink.clone());

    let invocation = runtime.run(script);
    let run_id = invocation.run_id();
    info!(%run_id, dispatched = sink.len(), "Script started");

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, invocation.outcome()).await.ok(),
        None => Some(invocation.outcome().await),
    };

    let result = match outcome {
        Some(Outcome::Settled(Ok(value))) => RunResult::Completed { value },
        Some(Outcome::Settled(Err(err))) => RunResult::Failed {
            error: err.to_string(),
        },
        Some(Outcome::Killed) => RunResult::Killed,
        None => {
            let after_ms = timeout.map(|d| d.as_millis() as u64).unwrap_or_default();
            warn!(%run_id, after_ms, "Script timed out");
            RunResult::TimedOut { after_ms }
        }
    };

    info!(%run_id, dispatched = sink.len(), "Script finished");
    RunReport {
        dispatched: sink.records(),
        result,
    }
}
