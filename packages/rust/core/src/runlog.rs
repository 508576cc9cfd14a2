//! Append-only JSON-lines log of every gateway call.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use copilot_shared::{CopilotError, Result, StageRecord};

/// Default log file name inside the output directory.
pub const RUN_LOG_FILE: &str = "run_log.jsonl";

/// Handle to `run_log.jsonl`. Records from earlier runs are never touched.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log at `<output_dir>/run_log.jsonl`.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(RUN_LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, creating the file and its parent if needed.
    pub fn append(&self, record: &StageRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CopilotError::io(parent, e))?;
        }

        let mut line = serde_json::to_string(record)
            .map_err(|e| CopilotError::validation(format!("JSON serialization failed: {e}")))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CopilotError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CopilotError::io(&self.path, e))?;

        debug!(stage = %record.stage, path = %self.path.display(), "appended run log record");
        Ok(())
    }

    /// Read every record back, oldest first.
    pub fn read_all(&self) -> Result<Vec<StageRecord>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| CopilotError::io(&self.path, e))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    CopilotError::validation(format!(
                        "invalid record in {}: {e}",
                        self.path.display()
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use copilot_shared::{ClientMeta, GatewayResponse, RunId, Stage};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("sc-runlog-test-{}", uuid::Uuid::now_v7()))
    }

    fn record(run_id: &RunId, stage: Stage) -> StageRecord {
        StageRecord {
            run_id: run_id.clone(),
            stage,
            logged_at: Utc::now(),
            response: GatewayResponse {
                payload: serde_json::json!({"output": [], "note": "multi\nline"}),
                client_meta: ClientMeta {
                    latency_ms: 12,
                    model: "openai/gpt-5.2".into(),
                },
            },
        }
    }

    #[test]
    fn append_creates_directory_and_file() {
        let tmp = temp_dir();
        let log = RunLog::in_dir(&tmp);
        log.append(&record(&RunId::new(), Stage::DraftAnswer)).unwrap();

        assert!(log.path().ends_with(RUN_LOG_FILE));
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with('\n'));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn append_preserves_earlier_runs() {
        let tmp = temp_dir();
        let log = RunLog::in_dir(&tmp);
        let first_run = RunId::new();
        let second_run = RunId::new();

        log.append(&record(&first_run, Stage::DraftAnswer)).unwrap();
        log.append(&record(&second_run, Stage::DraftAnswer)).unwrap();
        log.append(&record(&second_run, Stage::Review)).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].run_id, first_run);
        assert_eq!(records[2].stage, Stage::Review);
        assert_eq!(records[2].response.client_meta.latency_ms, 12);

        std::fs::remove_dir_all(&tmp).ok();
    }
}
