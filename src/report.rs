// src/report.rs
//! Run receipts written to .deploy-bootstrap/last-run.json

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::plan::StepKind;

const LAST_RUN_FILE: &str = "last-run.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    AlreadySatisfied,
    Failed { code: Option<i32> },
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub description: String,
    /// Masked command line, never the raw arguments.
    pub command: Option<String>,
    pub result: StepStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(project: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project: project.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        kind: StepKind,
        description: String,
        command: Option<String>,
        result: StepStatus,
    ) {
        self.steps.push(StepRecord {
            kind,
            description,
            command,
            result,
            at: Utc::now(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failures(&self) -> Vec<&StepRecord> {
        self.steps
            .iter()
            .filter(|s| matches!(s.result, StepStatus::Failed { .. }))
            .collect()
    }

    pub fn first_failure(&self) -> Option<&StepRecord> {
        self.failures().into_iter().next()
    }

    pub fn path(state_dir: &Path) -> PathBuf {
        state_dir.join(LAST_RUN_FILE)
    }

    pub fn save(&self, state_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("Failed to create {}", state_dir.display()))?;
        let path = Self::path(state_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved run report {} to {}", self.run_id, path.display());
        Ok(path)
    }

    pub fn load_last(state_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(state_dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let report: RunReport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join(".deploy-bootstrap");

        assert!(RunReport::load_last(&state).unwrap().is_none());

        let mut report = RunReport::new("shop");
        report.record(StepKind::EnsureCli, "Check".to_string(), None, StepStatus::AlreadySatisfied);
        report.record(
            StepKind::Login,
            "Log in".to_string(),
            Some("railway login".to_string()),
            StepStatus::Failed { code: Some(1) },
        );
        report.finish();
        report.save(&state).unwrap();

        let loaded = RunReport::load_last(&state).unwrap().unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.steps.len(), 2);
        assert!(loaded.finished_at.is_some());
        let failure = loaded.first_failure().unwrap();
        assert_eq!(failure.kind, StepKind::Login);
        assert_eq!(failure.result, StepStatus::Failed { code: Some(1) });
    }

    #[test]
    fn test_report_json_uses_kebab_case_step_kinds() {
        let mut report = RunReport::new("shop");
        report.record(StepKind::SetVariables, "Set X".to_string(), None, StepStatus::Skipped);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kind\":\"set-variables\""));
        assert!(json.contains("\"status\":\"skipped\""));
    }
}
