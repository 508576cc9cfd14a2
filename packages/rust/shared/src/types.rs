//! Core domain types for the support pipeline: messages, stages, gateway
//! responses and the records persisted for every run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CopilotError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One of the three pipeline steps, each backed by exactly one gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DraftAnswer,
    Review,
    FinalEmail,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::DraftAnswer, Stage::Review, Stage::FinalEmail];

    /// Stage name as written to the run log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DraftAnswer => "draft_answer",
            Self::Review => "review",
            Self::FinalEmail => "final_email",
        }
    }

    /// File name of the artifact this stage persists in the output directory.
    pub fn artifact_file_name(&self) -> &'static str {
        match self {
            Self::DraftAnswer => "answer_draft.json",
            Self::Review => "review.json",
            Self::FinalEmail => "email_final.txt",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a message sent to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Type tag of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    InputText,
    OutputText,
}

impl BlockKind {
    /// Wire value of the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputText => "input_text",
            Self::OutputText => "output_text",
        }
    }
}

/// A single typed text block inside a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub text: String,
}

impl ContentBlock {
    pub fn input_text(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::InputText,
            text: text.into(),
        }
    }
}

/// A role paired with its ordered content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A system message with a single `input_text` block.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentBlock::input_text(text)],
        }
    }

    /// A user message with a single `input_text` block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::input_text(text)],
        }
    }

    /// Concatenated text of all blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Generation parameters
// ---------------------------------------------------------------------------

/// Sampling configuration for one gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature, in `[0, 1]`.
    pub temperature: f64,
    /// Nucleus-sampling threshold, in `[0, 1]`.
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Upper bound on generated tokens, must be positive.
    pub max_output_tokens: u32,
}

fn default_top_p() -> f64 {
    1.0
}

impl GenerationParams {
    /// Build parameters, rejecting out-of-range values.
    pub fn new(temperature: f64, top_p: f64, max_output_tokens: u32) -> Result<Self> {
        let params = Self {
            temperature,
            top_p,
            max_output_tokens,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check that both probabilities lie in `[0, 1]` and the token limit is positive.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(CopilotError::validation(format!(
                "temperature {} must be within [0, 1]",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(CopilotError::validation(format!(
                "top_p {} must be within [0, 1]",
                self.top_p
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(CopilotError::validation(
                "max_output_tokens must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Gateway response
// ---------------------------------------------------------------------------

/// Metadata observed by the client around a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    /// Wall-clock latency of the HTTP exchange in milliseconds.
    pub latency_ms: u64,
    /// Model identifier the request was sent with.
    pub model: String,
}

/// The service's payload plus what the client observed while fetching it.
///
/// The payload is kept exactly as received (`null` when the body was not
/// valid JSON); client metadata lives beside it under `_client_meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub payload: serde_json::Value,
    #[serde(rename = "_client_meta")]
    pub client_meta: ClientMeta,
}

// ---------------------------------------------------------------------------
// Run log + artifacts
// ---------------------------------------------------------------------------

/// One line of `run_log.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub run_id: RunId,
    pub stage: Stage,
    pub logged_at: DateTime<Utc>,
    pub response: GatewayResponse,
}

/// A file persisted by a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub stage: Stage,
    pub path: PathBuf,
    /// SHA-256 of the written bytes.
    pub sha256: String,
    pub size_bytes: usize,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    pub run_id: RunId,
    pub draft: String,
    pub review: String,
    pub final_email: String,
    /// Persisted files in stage order.
    pub files: Vec<ArtifactMeta>,
    pub log_path: PathBuf,
}
