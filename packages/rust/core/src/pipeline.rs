//! End-to-end support pipeline: email + KB → draft → review → final email.
//!
//! Stages run strictly in order. Each stage's gateway response is appended
//! to the run log and its text persisted before the next stage starts; any
//! error aborts the run with earlier stages left on disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use copilot_gateway::{CompletionRequest, Gateway, extract_text};
use copilot_shared::{
    ArtifactMeta, CopilotError, Message, PipelineArtifacts, Result, RunId, Stage, StageRecord,
    StagesConfig,
};

use crate::context::KnowledgeContext;
use crate::prompts::PromptInputs;
use crate::runlog::RunLog;

/// Everything one run needs, resolved from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Trimmed customer email text.
    pub customer_email: String,
    /// Grounding context.
    pub knowledge: KnowledgeContext,
    /// Business named in the prompts.
    pub company: String,
    /// Model for the draft and final stages.
    pub draft_model: String,
    /// Model for the review stage.
    pub review_model: String,
    /// Per-stage generation parameters.
    pub stages: StagesConfig,
    /// Directory receiving artifacts and the run log.
    pub output_dir: PathBuf,
    /// Feed empty stage output forward instead of failing.
    pub allow_empty_output: bool,
}

impl RunConfig {
    /// Model a stage is sent to.
    pub fn model_for(&self, stage: Stage) -> &str {
        match stage {
            Stage::DraftAnswer | Stage::FinalEmail => &self.draft_model,
            Stage::Review => &self.review_model,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's gateway call.
    fn stage_started(&self, stage: Stage, model: &str);
    /// Called once a stage's artifact is on disk.
    fn stage_finished(&self, stage: Stage, latency_ms: u64);
    /// Called when the pipeline completes.
    fn done(&self, artifacts: &PipelineArtifacts);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage, _model: &str) {}
    fn stage_finished(&self, _stage: Stage, _latency_ms: u64) {}
    fn done(&self, _artifacts: &PipelineArtifacts) {}
}

/// Run the three stages once.
///
/// 1. Draft: email + KB → grounded JSON answer (`answer_draft.json`)
/// 2. Review: email + KB + draft → QA verdict (`review.json`)
/// 3. Final: email + KB + draft + review → email body (`email_final.txt`)
#[instrument(skip_all, fields(output_dir = %config.output_dir.display(), kb_files = config.knowledge.file_count()))]
pub async fn run_pipeline(
    gateway: &dyn Gateway,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineArtifacts> {
    let run_id = RunId::new();
    info!(%run_id, "starting support pipeline");

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| CopilotError::io(&config.output_dir, e))?;

    let log = RunLog::in_dir(&config.output_dir);
    let runner = StageRunner {
        gateway,
        config,
        log: &log,
        run_id: &run_id,
        progress,
    };
    let prompts = PromptInputs::new(
        &config.company,
        &config.customer_email,
        config.knowledge.as_str(),
    );

    let draft = runner.run(Stage::DraftAnswer, prompts.draft_messages()).await?;
    let review = runner
        .run(Stage::Review, prompts.review_messages(&draft.text))
        .await?;
    let final_email = runner
        .run(
            Stage::FinalEmail,
            prompts.final_email_messages(&draft.text, &review.text),
        )
        .await?;

    let artifacts = PipelineArtifacts {
        run_id,
        draft: draft.text,
        review: review.text,
        final_email: final_email.text,
        files: vec![draft.artifact, review.artifact, final_email.artifact],
        log_path: log.path().to_path_buf(),
    };

    progress.done(&artifacts);
    info!(run_id = %artifacts.run_id, "support pipeline complete");

    Ok(artifacts)
}

/// Output of one completed stage.
struct StageOutput {
    text: String,
    artifact: ArtifactMeta,
}

/// Borrowed run state shared by the three stage calls.
struct StageRunner<'a> {
    gateway: &'a dyn Gateway,
    config: &'a RunConfig,
    log: &'a RunLog,
    run_id: &'a RunId,
    progress: &'a dyn ProgressReporter,
}

impl StageRunner<'_> {
    /// Call → log → extract → persist.
    async fn run(&self, stage: Stage, messages: Vec<Message>) -> Result<StageOutput> {
        let model = self.config.model_for(stage);
        let params = self.config.stages.for_stage(stage);

        self.progress.stage_started(stage, model);
        info!(%stage, model, temperature = params.temperature, "calling gateway");

        let request = CompletionRequest::new(model, messages, params);
        let response = self.gateway.complete(&request).await?;
        let latency_ms = response.client_meta.latency_ms;

        let record = StageRecord {
            run_id: self.run_id.clone(),
            stage,
            logged_at: Utc::now(),
            response,
        };
        self.log.append(&record)?;

        let text = extract_text(&record.response);
        if text.is_empty() {
            if !self.config.allow_empty_output {
                return Err(CopilotError::EmptyOutput { stage });
            }
            warn!(%stage, "stage returned no output text, continuing");
        }

        let artifact = write_artifact(&self.config.output_dir, stage, &text)?;
        self.progress.stage_finished(stage, latency_ms);
        info!(%stage, latency_ms, chars = text.len(), "stage complete");

        Ok(StageOutput { text, artifact })
    }
}

/// Write `<text>\n` to the stage's artifact file via temp file + rename.
fn write_artifact(output_dir: &Path, stage: Stage, text: &str) -> Result<ArtifactMeta> {
    let file_name = stage.artifact_file_name();
    let target = output_dir.join(file_name);
    let temp = output_dir.join(format!(".{file_name}.tmp"));
    let content = format!("{text}\n");

    std::fs::write(&temp, &content).map_err(|e| CopilotError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, &target) {
        std::fs::remove_file(&temp).ok();
        return Err(CopilotError::io(&target, e));
    }

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %file_name, size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        stage,
        path: target,
        sha256,
        size_bytes: content.len(),
    })
}
