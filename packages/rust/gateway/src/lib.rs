//! Model gateway: the only component that talks to the completion service.
//!
//! This crate provides:
//! - [`Gateway`]: the seam the pipeline calls through (stubbed in tests)
//! - [`ResponsesClient`]: `reqwest` implementation of the `/v1/responses` protocol
//! - [`extract_text`]: pulls `output_text` blocks out of a [`GatewayResponse`]

mod client;
mod extract;

use async_trait::async_trait;

use copilot_shared::{GatewayResponse, GenerationParams, Message, Result};

pub use client::{RESPONSES_PATH, ResponsesClient};
pub use extract::{extract_output_text, extract_text};

/// One completion call: which model, what messages, how to sample.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub input: Vec<Message>,
    pub params: GenerationParams,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, input: Vec<Message>, params: GenerationParams) -> Self {
        Self {
            model: model.into(),
            input,
            params,
        }
    }
}

/// A completion service reachable with a single blocking-style call.
///
/// Implementations perform no logging to disk and no persistence; the
/// pipeline owns both.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Execute one completion call.
    ///
    /// # Errors
    ///
    /// Returns [`CopilotError::Gateway`](copilot_shared::CopilotError::Gateway)
    /// on a status ≥ 400, [`CopilotError::Transport`](copilot_shared::CopilotError::Transport)
    /// on network failure, and a validation error for out-of-range parameters.
    async fn complete(&self, request: &CompletionRequest) -> Result<GatewayResponse>;
}
