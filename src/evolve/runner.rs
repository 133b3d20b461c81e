//! Out-of-process artifact execution with a hard wall-clock timeout.
//!
//! The artifact runs behind an intermediate runner script in its own
//! process; a hung or runaway artifact is killed at the limit and treated as
//! having produced no proposal. A run that does produce one hands it back
//! through a reserved proposal file, consumed exactly once per cycle.

use std::fs;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

/// Outcome of one artifact execution.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Process finished; `status` is its exit code when one exists.
    Completed { status: Option<i32> },
    /// Killed at the wall-clock limit.
    TimedOut,
    /// Could not be spawned or awaited.
    Failed(String),
}

/// Run `runner` under `interpreter`, echoing its output, bounded by
/// `timeout`.
pub async fn execute(interpreter: &str, runner: &Path, timeout: Duration) -> ExecOutcome {
    println!("\n=== Running {} ===", runner.display());
    println!("{}", "-".repeat(40));

    let mut command = Command::new(interpreter);
    command
        .arg(runner)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            println!("Error running {}: {err}", runner.display());
            return ExecOutcome::Failed(err.to_string());
        }
    };

    // On timeout the output future is dropped, which kills the child.
    let outcome = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            if !output.stdout.is_empty() {
                print!("{}", String::from_utf8_lossy(&output.stdout));
            }
            if !output.stderr.is_empty() {
                print!("ERRORS: {}", String::from_utf8_lossy(&output.stderr));
            }
            let status = output.status.code();
            if !output.status.success() {
                println!(
                    "Process exited with code: {}",
                    status.map_or_else(|| "signal".to_string(), |c| c.to_string())
                );
            }
            ExecOutcome::Completed { status }
        }
        Ok(Err(err)) => {
            println!("Error running {}: {err}", runner.display());
            ExecOutcome::Failed(err.to_string())
        }
        Err(_) => {
            println!("Execution timed out after {} seconds!", timeout.as_secs());
            ExecOutcome::TimedOut
        }
    };

    println!("{}", "-".repeat(40));
    outcome
}

/// Consume the reserved proposal file, if the run produced one.
///
/// The file is deleted on read so each handoff is used at most once; an
/// empty or whitespace-only file counts as no proposal.
pub fn take_proposal(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), "failed to remove proposal file: {err}");
    }
    if text.trim().is_empty() {
        return None;
    }
    info!(path = %path.display(), bytes = text.len(), "proposal handed off from run");
    Some(text)
}
