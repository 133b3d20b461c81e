//! metamorph — gated self-evolution of one program artifact.
//!
//! Two halves:
//! - `llm`: a resilient multi-provider chat-completion layer (routing,
//!   credentials, retry, bounded-concurrency batch dispatch)
//! - `evolve`: the evolution control loop (checkpoint, generate, extract,
//!   safety gate, diff review, apply, execute)

pub mod evolve;
pub mod llm;
