//! Application configuration for Support Copilot.
//!
//! User config lives at `~/.support-copilot/support-copilot.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CopilotError, Result};
use crate::types::{GenerationParams, Stage};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "support-copilot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".support-copilot";

// ---------------------------------------------------------------------------
// Config structs (matching support-copilot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Model identifiers per stage pairing.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Per-stage generation parameters.
    #[serde(default)]
    pub stages: StagesConfig,

    /// Prompt wording.
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Run behaviour and output location.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the completion service; requests go to `<base_url>/v1/responses`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.concentrate.ai".into()
}
fn default_api_key_env() -> String {
    "CONCENTRATE_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[models]` section. Draft and final stages share one model; review uses another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_draft_model")]
    pub draft: String,

    #[serde(default = "default_review_model")]
    pub review: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            draft: default_draft_model(),
            review: default_review_model(),
        }
    }
}

fn default_draft_model() -> String {
    "openai/gpt-5.2".into()
}
fn default_review_model() -> String {
    "anthropic/claude-opus-4.5".into()
}

/// `[stages.*]` sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_draft_params")]
    pub draft_answer: GenerationParams,

    #[serde(default = "default_review_params")]
    pub review: GenerationParams,

    #[serde(default = "default_final_params")]
    pub final_email: GenerationParams,
}

impl StagesConfig {
    /// Parameters used for the given stage.
    pub fn for_stage(&self, stage: Stage) -> GenerationParams {
        match stage {
            Stage::DraftAnswer => self.draft_answer,
            Stage::Review => self.review,
            Stage::FinalEmail => self.final_email,
        }
    }
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            draft_answer: default_draft_params(),
            review: default_review_params(),
            final_email: default_final_params(),
        }
    }
}

// Exploratory draft, near-deterministic review, moderate final.
fn default_draft_params() -> GenerationParams {
    GenerationParams {
        temperature: 0.8,
        top_p: 1.0,
        max_output_tokens: 900,
    }
}
fn default_review_params() -> GenerationParams {
    GenerationParams {
        temperature: 0.2,
        top_p: 1.0,
        max_output_tokens: 700,
    }
}
fn default_final_params() -> GenerationParams {
    GenerationParams {
        temperature: 0.4,
        top_p: 1.0,
        max_output_tokens: 600,
    }
}

/// `[prompts]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Business the help center answers for, named in every system prompt.
    #[serde(default = "default_company")]
    pub company: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            company: default_company(),
        }
    }
}

fn default_company() -> String {
    "Olivetto olive oil importers".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory receiving artifacts and `run_log.jsonl`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Feed empty stage output forward instead of failing the run.
    #[serde(default)]
    pub allow_empty_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            allow_empty_output: false,
        }
    }
}

fn default_output_dir() -> String {
    "outputs".into()
}

impl AppConfig {
    /// Check values that serde cannot: URL syntax, timeout, parameter ranges.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url).map_err(|e| {
            CopilotError::config(format!("invalid api.base_url '{}': {e}", self.api.base_url))
        })?;

        if self.api.timeout_secs == 0 {
            return Err(CopilotError::config("api.timeout_secs must be greater than zero"));
        }
        if self.api.api_key_env.trim().is_empty() {
            return Err(CopilotError::config("api.api_key_env must name an environment variable"));
        }

        for stage in Stage::ALL {
            self.stages.for_stage(stage).validate().map_err(|e| {
                CopilotError::config(format!("stages.{stage}: {e}"))
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// The bearer credential for the completion service.
///
/// Resolved once at the program boundary and passed down explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a non-empty key.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CopilotError::config("API key is empty"));
        }
        Ok(Self(value))
    }

    /// The raw secret, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read the API key from the env var named in `[api]`.
pub fn resolve_api_key(api: &ApiConfig) -> Result<ApiKey> {
    let var_name = &api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => ApiKey::new(val),
        _ => Err(CopilotError::config(format!(
            "Missing {var_name}. Set it in your env:\n  export {var_name}='...'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.support-copilot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CopilotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.support-copilot/support-copilot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CopilotError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CopilotError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CopilotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CopilotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CopilotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("CONCENTRATE_API_KEY"));
        assert!(toml_str.contains("[stages.review]"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.api.timeout_secs, 120);
        assert_eq!(parsed.models.draft, "openai/gpt-5.2");
        assert_eq!(parsed.models.review, "anthropic/claude-opus-4.5");
        assert_eq!(parsed.stages.draft_answer.max_output_tokens, 900);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn stage_defaults_follow_temperature_profile() {
        let stages = StagesConfig::default();
        assert_eq!(stages.for_stage(Stage::DraftAnswer).temperature, 0.8);
        assert_eq!(stages.for_stage(Stage::Review).temperature, 0.2);
        assert_eq!(stages.for_stage(Stage::FinalEmail).temperature, 0.4);
        assert_eq!(stages.for_stage(Stage::Review).max_output_tokens, 700);
        assert_eq!(stages.for_stage(Stage::FinalEmail).max_output_tokens, 600);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[models]
review = "anthropic/claude-sonnet-4.5"

[stages.review]
temperature = 0.0
max_output_tokens = 400
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.models.draft, "openai/gpt-5.2");
        assert_eq!(config.models.review, "anthropic/claude-sonnet-4.5");
        assert_eq!(config.stages.review.top_p, 1.0);
        assert_eq!(config.stages.review.max_output_tokens, 400);
        assert_eq!(config.stages.final_email.temperature, 0.4);
        assert_eq!(config.prompts.company, "Olivetto olive oil importers");
        assert!(!config.pipeline.allow_empty_output);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stages.final_email.temperature = 3.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stages.final_email"));
    }

    #[test]
    fn api_key_resolution() {
        let api = ApiConfig {
            // Use a unique env var name to avoid interfering with other tests
            api_key_env: "SC_TEST_NONEXISTENT_KEY_12345".into(),
            ..ApiConfig::default()
        };
        let err = resolve_api_key(&api).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Missing SC_TEST_NONEXISTENT_KEY_12345"));
        assert!(msg.contains("export SC_TEST_NONEXISTENT_KEY_12345="));
    }

    #[test]
    fn api_key_is_redacted() {
        let key = ApiKey::new("sk-secret").unwrap();
        assert_eq!(key.expose(), "sk-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
        assert!(ApiKey::new("   ").is_err());
    }
}
