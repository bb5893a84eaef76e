use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use routine_cli::{demo_controls, load_script, read_source, run_script, Config, RunResult};

#[derive(Parser)]
#[command(name = "routine")]
#[command(about = "Run JSON-described routines against the demo controls")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script: {"steps": [...], "returns": ...}
    Run {
        /// Script path, or "-" for stdin
        path: PathBuf,

        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List the demo control types
    Controls,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    info!("Routine CLI starting...");
    config.log_redacted();

    match cli.command {
        Commands::Controls => {
            for action_type in demo_controls(&config).types() {
                println!("{action_type}");
            }
        }
        Commands::Run { path, timeout_ms } => {
            let source = read_source(&path)?;
            let script = load_script(&source)
                .with_context(|| format!("Failed to load script {}", path.display()))?;

            let report = run_script(script, &config, timeout_ms.map(Duration::from_millis)).await;
            for record in &report.dispatched {
                println!("{}", serde_json::to_string(record)?);
            }
            println!("{}", serde_json::to_string(&report.result)?);

            if matches!(report.result, RunResult::Failed { .. }) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
