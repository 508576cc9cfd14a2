//! Pipeline orchestration and domain logic for Support Copilot.
//!
//! This crate ties together knowledge-base loading, prompt building, the
//! model gateway and the run log into the three-stage support workflow
//! (`run_pipeline`).

pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod runlog;

pub use context::{FILE_HEADER_PREFIX, KnowledgeContext, load_context, load_email};
pub use pipeline::{ProgressReporter, RunConfig, SilentProgress, run_pipeline};
pub use prompts::PromptInputs;
pub use runlog::{RUN_LOG_FILE, RunLog};
