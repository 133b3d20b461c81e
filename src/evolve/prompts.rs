//! Prompt templates for the generation call.
//!
//! The system prompt tells the model how the harness it is talking to
//! actually works: the checkpoint/review/apply cycle and the runner's
//! file-handoff contract. When harness or runner source is available on
//! disk it is embedded verbatim; otherwise a built-in description stands in.

/// Fallback description of the orchestration cycle, used when no harness
/// reference source is configured.
pub const HARNESS_CONTRACT: &str = "\
The harness runs an interactive loop. Each generation it:
1. Snapshots the current artifact into a timestamped checkpoint.
2. Sends the artifact to you and extracts the LAST fenced code block from
   your response as the proposed rewrite.
3. Runs an automated safety review of the proposal; an UNSAFE verdict skips
   the generation outright.
4. Shows the operator a unified diff and asks for explicit confirmation.
5. On approval, overwrites the artifact in place (the checkpoint remains as
   the rollback point) and may execute it in a separate process under a
   wall-clock timeout.";

/// Description of the intermediate runner's file-handoff contract.
pub const RUNNER_CONTRACT: &str = "\
The artifact is executed through an intermediate runner process. The runner
calls the artifact's zero-argument main() entry point; if that call returns
a non-empty source string, the runner writes it verbatim to a reserved
proposal file, and the harness uses it to seed the next generation instead
of calling you again.";

/// Rules the proposed artifact must follow.
pub const ARTIFACT_RULES: &str = "\
Rules for the code:
- Must contain a main() function
- Must have the standard entry-point guard at the end
- Should produce visible output when run
- Avoid infinite loops or anything that would hang
- Can include imports from the standard library";

/// Build the (system, user) prompt pair for one generation call.
pub fn build_generation_prompt(
    harness_source: Option<&str>,
    runner_source: Option<&str>,
    artifact: &str,
) -> (String, String) {
    let harness = match harness_source {
        Some(source) => format!("Here is the evolution harness:\n\n```\n{source}\n```"),
        None => format!("How the evolution harness works:\n\n{HARNESS_CONTRACT}"),
    };
    let runner = match runner_source {
        Some(source) => format!("Here is the intermediate runner:\n\n```\n{source}\n```"),
        None => RUNNER_CONTRACT.to_string(),
    };

    let system = format!(
        "You are a creative AI exploring interesting behaviors through code evolution. \
You are part of a self-evolving system where you can modify the artifact program.

{harness}

{runner}

Understanding this system:
- Your responses are processed to extract code blocks
- The artifact you create will be run after evolution
- Each evolution is backed up with timestamps
- The operator confirms before applying changes

Your task is to:
1. Analyze the current artifact and think about interesting directions to take it
2. Be creative, experimental, and explore unexpected behaviors
3. You can completely change what the program does
4. Consider meta-programming, self-reflection, emergent behaviors, or anything you find interesting
5. You could even reference your knowledge of the evolution system itself

{ARTIFACT_RULES}

Feel free to explain your thinking and what makes your evolution interesting!"
    );

    let user = format!(
        "Here is the current artifact:\n\n```\n{artifact}\n```\n\n\
Please provide an evolved version of this file.\n\
What interesting direction can you take this code? What behaviors do you want to explore?\n\
Share your thoughts, then provide the new code.\n\n\
Format your response with the new code in a code block like this:\n\
```\n# Your new artifact code here\n```"
    );

    (system, user)
}
