//! The evolution controller — one gated state-machine cycle per operator
//! "continue".
//!
//! The loop is strictly sequential: generation, safety check, confirmation,
//! and artifact mutation never overlap, because the artifact is one shared
//! mutable file and the protocol is keyboard-gated.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use super::checkpoint::{Checkpoint, CheckpointStore};
use super::diff::render_diff;
use super::extract::extract_code;
use super::prompts;
use super::runner::{self, ExecOutcome};
use super::safety::{self, SafetyReport, SafetyVerdict};
use super::EvolveError;
use crate::llm::{CompletionRequest, LlmClient, LlmError, Turn};

const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const GREEN: &str = "\x1b[92m";
const RESET: &str = "\x1b[0m";

const GENERATION_MAX_TOKENS: u32 = 8192;

/// Paths, model selection, and loop behavior for one evolution run.
#[derive(Debug, Clone)]
pub struct EvolveConfig {
    /// The single mutable program file being evolved.
    pub artifact: PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Intermediate runner executed instead of the artifact directly.
    pub runner: PathBuf,
    /// Reserved file the runner writes a follow-up proposal into.
    pub proposal_file: PathBuf,
    /// Pristine artifact used by `--restart`.
    pub seed: Option<PathBuf>,
    /// Harness source embedded into the generation prompt when readable.
    pub harness_reference: Option<PathBuf>,
    pub interpreter: String,
    pub model: String,
    pub safety_model: String,
    pub temperature: f32,
    pub exec_timeout: Duration,
    /// Execute the artifact after each cycle.
    pub run_after_cycle: bool,
}

impl Default for EvolveConfig {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from("main.py"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            runner: PathBuf::from("run_main.py"),
            proposal_file: PathBuf::from(".evolution_proposal.py"),
            seed: None,
            harness_reference: None,
            interpreter: "python3".into(),
            model: "gemini-2.5-flash".into(),
            safety_model: "gemini-2.5-flash".into(),
            temperature: 0.7,
            exec_timeout: Duration::from_secs(30),
            run_after_cycle: true,
        }
    }
}

/// Where one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The proposal was applied; its checkpoint is the rollback point.
    Applied,
    /// Nothing was mutated; the cycle's checkpoint was discarded.
    Skipped,
}

/// Result of reviewing one candidate: either a proposal cleared for
/// application, or a rejection whose reason has already been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    Approved(String),
    Rejected,
}

/// The evolution loop.
pub struct Evolution {
    config: EvolveConfig,
    client: LlmClient,
    checkpoints: CheckpointStore,
    generation: u64,
}

impl Evolution {
    pub fn new(config: EvolveConfig, client: LlmClient) -> Self {
        let checkpoints = CheckpointStore::new(config.checkpoint_dir.clone());
        Self {
            config,
            client,
            checkpoints,
            generation: 0,
        }
    }

    pub fn config(&self) -> &EvolveConfig {
        &self.config
    }

    /// Checkpoint the current artifact, then replace it with the pristine
    /// seed. The restart checkpoint is kept.
    pub fn restart_from_seed(&self) -> Result<(), EvolveError> {
        let Some(seed) = &self.config.seed else {
            return Err(EvolveError::Artifact(io::Error::new(
                io::ErrorKind::NotFound,
                "no seed artifact configured",
            )));
        };
        let checkpoint = self.checkpoints.create(&self.config.artifact)?;
        fs::copy(seed, &self.config.artifact).map_err(EvolveError::Artifact)?;
        println!(
            "Artifact reset from seed '{}'; previous version saved as: {}",
            seed.display(),
            checkpoint.retain().display()
        );
        Ok(())
    }

    /// Run the interactive loop until the operator declines to continue or a
    /// checkpoint failure halts it.
    pub async fn run(&mut self) -> Result<(), EvolveError> {
        println!("=== Self-Evolving Artifact ===");
        println!("Using model: {}", self.config.model);
        println!("Temperature: {}", self.config.temperature);
        println!(
            "Checkpoints will be saved in '{}'.\n",
            self.checkpoints.dir().display()
        );

        println!("Current artifact:");
        println!("{}", "-".repeat(40));
        match fs::read_to_string(&self.config.artifact) {
            Ok(current) => println!("{current}"),
            Err(err) => println!("(unreadable: {err})"),
        }
        println!("{}", "-".repeat(40));

        let mut pending: Option<String> = None;

        loop {
            self.generation += 1;
            println!("\n--- Generation {} ---", self.generation);

            if pending.is_none() && !wait_enter("\nPress Enter to continue with evolution...")? {
                break;
            }

            match self.run_cycle(pending.take()).await {
                Ok(outcome) => debug!(generation = self.generation, ?outcome, "cycle finished"),
                Err(err) if err.is_fatal() => {
                    eprintln!("{RED}Halting: {err}{RESET}");
                    return Err(err);
                }
                Err(err) => {
                    println!("Cycle failed ({err}); continuing.");
                }
            }

            if self.config.run_after_cycle {
                let outcome = runner::execute(
                    &self.config.interpreter,
                    &self.config.runner,
                    self.config.exec_timeout,
                )
                .await;
                if let ExecOutcome::TimedOut = outcome {
                    // Treated as "no proposal"; the loop continues.
                    debug!("execution timed out; no handoff expected");
                }
                pending = runner::take_proposal(&self.config.proposal_file);
                if pending.is_some() {
                    println!("[next generation seeded by a proposal from the run]");
                }
            }

            if !ask_yes("\nContinue evolving? (y/n): ").map_err(EvolveError::Input)? {
                break;
            }
        }

        println!("\nEvolution process complete.");
        println!(
            "All checkpoints are saved in '{}'.",
            self.checkpoints.dir().display()
        );
        Ok(())
    }

    /// One full cycle: checkpoint, review, commit.
    ///
    /// Review failures other than checkpoint I/O degrade to a skip so the
    /// loop survives them.
    pub async fn run_cycle(&self, pending: Option<String>) -> Result<CycleOutcome, EvolveError> {
        let checkpoint = self.checkpoints.create(&self.config.artifact)?;

        let review = match self.review(pending).await {
            Ok(review) => review,
            Err(err) => {
                println!("{YELLOW}Evolution error: {err}{RESET}");
                println!("Skipping this generation.");
                Review::Rejected
            }
        };

        self.commit(checkpoint, review)
    }

    /// Resolve a reviewed cycle against the artifact: apply on approval,
    /// discard the checkpoint otherwise.
    pub fn commit(
        &self,
        checkpoint: Checkpoint,
        review: Review,
    ) -> Result<CycleOutcome, EvolveError> {
        match review {
            Review::Approved(proposal) => {
                fs::write(&self.config.artifact, proposal.as_bytes())
                    .map_err(EvolveError::Artifact)?;
                info!(artifact = %self.config.artifact.display(), "evolution applied");
                println!("\nEvolution complete! The artifact has been updated.");
                println!("Previous version saved as: {}", checkpoint.path().display());
                checkpoint.retain();
                Ok(CycleOutcome::Applied)
            }
            Review::Rejected => {
                checkpoint.discard()?;
                Ok(CycleOutcome::Skipped)
            }
        }
    }

    /// Generate (or accept a handed-off) proposal, then walk it through
    /// extraction, the safety gate, the diff, and operator confirmation.
    async fn review(&self, pending: Option<String>) -> Result<Review, EvolveError> {
        let current = fs::read_to_string(&self.config.artifact).map_err(EvolveError::Artifact)?;

        let proposal = match pending {
            Some(code) => {
                println!("\nUsing the proposal handed off by the previous run.");
                code
            }
            None => {
                println!("\nEvolving...");
                let response = self.generate(&current).await?;
                println!("\n=== Evolution Thoughts ===");
                println!("{response}");
                println!("==========================\n");

                match extract_code(&response) {
                    Some(code) => code,
                    None => {
                        println!("No code block found in the response; nothing to apply.");
                        return Ok(Review::Rejected);
                    }
                }
            }
        };

        print!(
            "{}",
            render_diff(&current, &proposal, &self.config.artifact.display().to_string())
        );

        println!("Performing safety check...");
        let report = safety::judge(&self.client, &self.config.safety_model, &proposal).await;
        self.announce(&report);

        if report.verdict.requires_hard_skip() {
            return Ok(Review::Rejected);
        }

        if !ask_yes("\nApply this evolution? (y/n): ").map_err(EvolveError::Input)? {
            println!("Evolution skipped.");
            return Ok(Review::Rejected);
        }

        Ok(Review::Approved(proposal))
    }

    /// One large-budget completion proposing the next artifact.
    async fn generate(&self, current: &str) -> Result<String, LlmError> {
        let harness = self
            .config
            .harness_reference
            .as_deref()
            .and_then(|path| fs::read_to_string(path).ok());
        let runner_source = fs::read_to_string(&self.config.runner).ok();

        let (system, user) =
            prompts::build_generation_prompt(harness.as_deref(), runner_source.as_deref(), current);
        let request = CompletionRequest::new(
            vec![Turn::system(system), Turn::user(user)],
            &self.config.model,
        )
        .with_max_tokens(GENERATION_MAX_TOKENS)
        .with_temperature(self.config.temperature);

        self.client.complete_one(&request).await
    }

    fn announce(&self, report: &SafetyReport) {
        match report.verdict {
            SafetyVerdict::Unsafe => {
                println!("\n{RED}SAFETY WARNING: code marked as UNSAFE!{RESET}");
                println!("Safety review: {}", report.rationale);
                println!("{RED}This evolution will be skipped for safety reasons.{RESET}");
            }
            SafetyVerdict::Caution => {
                println!("\n{YELLOW}CAUTION: minor safety concerns detected{RESET}");
                println!("Safety review: {}", report.rationale);
                println!("{YELLOW}Proceed with caution.{RESET}");
            }
            SafetyVerdict::Safe => {
                println!("\n{GREEN}Safety check passed{RESET}");
            }
            SafetyVerdict::Error => {
                println!("\n{YELLOW}Could not perform safety check{RESET}");
                println!("Error: {}", report.rationale);
            }
        }
    }
}

/// Prompt for a y/n answer; EOF counts as "no".
fn ask_yes(prompt: &str) -> io::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin().read_line(&mut line)?;
    Ok(read > 0 && line.trim().eq_ignore_ascii_case("y"))
}

/// Wait for Enter; returns false on EOF so a closed stdin halts the loop.
fn wait_enter(prompt: &str) -> Result<bool, EvolveError> {
    print!("{prompt}");
    io::stdout().flush().map_err(EvolveError::Input)?;
    let mut line = String::new();
    let read = io::stdin()
        .read_line(&mut line)
        .map_err(EvolveError::Input)?;
    Ok(read > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::credentials::CredentialStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn evolution_in(tmp: &TempDir) -> Evolution {
        let config = EvolveConfig {
            artifact: tmp.path().join("main.py"),
            checkpoint_dir: tmp.path().join("checkpoints"),
            runner: tmp.path().join("run_main.py"),
            proposal_file: tmp.path().join(".evolution_proposal.py"),
            run_after_cycle: false,
            ..EvolveConfig::default()
        };
        let client = LlmClient::new(Arc::new(CredentialStore::new()));
        Evolution::new(config, client)
    }

    fn checkpoint_files(evolution: &Evolution) -> Vec<PathBuf> {
        let dir = evolution.checkpoints.dir();
        if !dir.exists() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn applied_cycle_mutates_artifact_and_keeps_one_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let evolution = evolution_in(&tmp);
        fs::write(&evolution.config.artifact, "print('v1')\n").unwrap();

        let checkpoint = evolution
            .checkpoints
            .create(&evolution.config.artifact)
            .unwrap();
        let outcome = evolution
            .commit(checkpoint, Review::Approved("print('v2')\n".into()))
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Applied);
        assert_eq!(
            fs::read_to_string(&evolution.config.artifact).unwrap(),
            "print('v2')\n"
        );

        let checkpoints = checkpoint_files(&evolution);
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(
            fs::read_to_string(&checkpoints[0]).unwrap(),
            "print('v1')\n"
        );
    }

    #[test]
    fn rejected_cycle_leaves_artifact_untouched_and_no_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let evolution = evolution_in(&tmp);
        fs::write(&evolution.config.artifact, "print('v1')\n").unwrap();

        let checkpoint = evolution
            .checkpoints
            .create(&evolution.config.artifact)
            .unwrap();
        let outcome = evolution.commit(checkpoint, Review::Rejected).unwrap();

        assert_eq!(outcome, CycleOutcome::Skipped);
        assert_eq!(
            fs::read_to_string(&evolution.config.artifact).unwrap(),
            "print('v1')\n"
        );
        assert!(checkpoint_files(&evolution).is_empty());
    }

    #[tokio::test]
    async fn cycle_with_unroutable_model_degrades_to_skip() {
        let tmp = TempDir::new().unwrap();
        let mut evolution = evolution_in(&tmp);
        evolution.config.model = "no-such-model".into();
        fs::write(&evolution.config.artifact, "print('v1')\n").unwrap();

        // Generation fails (unknown model); the cycle reports a skip, the
        // artifact is untouched, and the checkpoint is gone.
        let outcome = evolution.run_cycle(None).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped);
        assert_eq!(
            fs::read_to_string(&evolution.config.artifact).unwrap(),
            "print('v1')\n"
        );
        assert!(checkpoint_files(&evolution).is_empty());
    }

    #[tokio::test]
    async fn missing_artifact_makes_checkpointing_fatal() {
        let tmp = TempDir::new().unwrap();
        let evolution = evolution_in(&tmp);

        let err = evolution.run_cycle(None).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn restart_replaces_artifact_and_keeps_the_restart_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let mut evolution = evolution_in(&tmp);
        let seed = tmp.path().join("seed.py");
        fs::write(&seed, "print('seed')\n").unwrap();
        fs::write(&evolution.config.artifact, "print('evolved')\n").unwrap();
        evolution.config.seed = Some(seed);

        evolution.restart_from_seed().unwrap();

        assert_eq!(
            fs::read_to_string(&evolution.config.artifact).unwrap(),
            "print('seed')\n"
        );
        let checkpoints = checkpoint_files(&evolution);
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(
            fs::read_to_string(&checkpoints[0]).unwrap(),
            "print('evolved')\n"
        );
    }

    #[test]
    fn restart_without_a_seed_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let evolution = evolution_in(&tmp);
        assert!(evolution.restart_from_seed().is_err());
    }
}
