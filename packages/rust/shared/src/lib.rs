//! Shared types, error model, and configuration for Support Copilot.
//!
//! This crate is the foundation depended on by all other Support Copilot crates.
//! It provides:
//! - [`CopilotError`]: the unified error type
//! - Domain types ([`Message`], [`Stage`], [`GatewayResponse`], [`StageRecord`])
//! - Configuration ([`AppConfig`], [`ApiKey`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, ApiKey, AppConfig, ModelsConfig, PipelineConfig, PromptsConfig, StagesConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{CopilotError, ERROR_BODY_EXCERPT_CHARS, Result};
pub use types::{
    ArtifactMeta, BlockKind, ClientMeta, ContentBlock, GatewayResponse, GenerationParams, Message,
    PipelineArtifacts, Role, RunId, Stage, StageRecord,
};
