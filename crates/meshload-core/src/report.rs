//! Run report (stable v1)
//!
//! Written by `meshload load --report`. Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Pipeline states, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Start,
    Discover,
    ExtractAndNormalize,
    ResetSnapshotTable,
    LoadSnapshot,
    LoadHistory,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Discover => "DISCOVER",
            Self::ExtractAndNormalize => "EXTRACT_AND_NORMALIZE",
            Self::ResetSnapshotTable => "RESET_SNAPSHOT_TABLE",
            Self::LoadSnapshot => "LOAD_SNAPSHOT",
            Self::LoadHistory => "LOAD_HISTORY",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// Next state on success; terminal states stay put
    pub fn next(&self) -> PipelineStage {
        match self {
            Self::Start => Self::Discover,
            Self::Discover => Self::ExtractAndNormalize,
            Self::ExtractAndNormalize => Self::ResetSnapshotTable,
            Self::ResetSnapshotTable => Self::LoadSnapshot,
            Self::LoadSnapshot => Self::LoadHistory,
            Self::LoadHistory => Self::Done,
            Self::Done => Self::Done,
            Self::Failed => Self::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one executed stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: PipelineStage,

    pub succeeded: bool,

    /// Milliseconds spent in the stage
    pub elapsed_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    pub run_id: String,

    /// Timestamp (ISO 8601)
    pub started_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    /// Final state: `DONE` or `FAILED`
    pub state: PipelineStage,

    pub products: usize,
    pub contracts: usize,
    pub snapshot_rows: usize,
    pub history_rows: usize,

    pub stages: Vec<StageOutcome>,
}

impl RunReport {
    /// Start a report with a fresh run id
    pub fn new() -> Self {
        let started_at = chrono::Utc::now().to_rfc3339();
        Self {
            version: ReportVersion::CURRENT,
            run_id: run_id_for(&started_at),
            started_at,
            finished_at: None,
            state: PipelineStage::Start,
            products: 0,
            contracts: 0,
            snapshot_rows: 0,
            history_rows: 0,
            stages: Vec::new(),
        }
    }

    pub fn record_stage(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    /// Close the report in a terminal state
    pub fn finish(&mut self, state: PipelineStage) {
        self.state = state;
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    /// The stage that failed, if any
    pub fn failed_stage(&self) -> Option<PipelineStage> {
        self.stages.iter().find(|s| !s.succeeded).map(|s| s.stage)
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineStage::Done
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports created so far by this process
static REPORTS_CREATED: AtomicU64 = AtomicU64::new(0);

/// 12 hex chars derived from the start time, process id and a per-process counter
fn run_id_for(started_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(started_at.as_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(REPORTS_CREATED.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order() {
        let mut stage = PipelineStage::Start;
        let mut visited = vec![stage];
        while !stage.is_terminal() {
            stage = stage.next();
            visited.push(stage);
        }

        assert_eq!(
            visited,
            vec![
                PipelineStage::Start,
                PipelineStage::Discover,
                PipelineStage::ExtractAndNormalize,
                PipelineStage::ResetSnapshotTable,
                PipelineStage::LoadSnapshot,
                PipelineStage::LoadHistory,
                PipelineStage::Done,
            ]
        );
        assert_eq!(PipelineStage::Failed.next(), PipelineStage::Failed);
    }

    #[test]
    fn empty_report() {
        let report = RunReport::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.run_id.len(), 12);
        assert_eq!(report.state, PipelineStage::Start);
        assert!(report.failed_stage().is_none());
        assert!(!report.succeeded());
    }

    #[test]
    fn run_ids_differ_within_a_process() {
        let first = RunReport::new();
        let second = RunReport::new();
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn failed_stage_is_reported() {
        let mut report = RunReport::new();
        report.record_stage(StageOutcome {
            stage: PipelineStage::Discover,
            succeeded: true,
            elapsed_ms: 3,
            error: None,
        });
        report.record_stage(StageOutcome {
            stage: PipelineStage::LoadHistory,
            succeeded: false,
            elapsed_ms: 10,
            error: Some("insert failed".to_string()),
        });
        report.finish(PipelineStage::Failed);

        assert_eq!(report.failed_stage(), Some(PipelineStage::LoadHistory));
        assert!(report.finished_at.is_some());
        assert!(!report.succeeded());
    }

    #[test]
    fn report_serialization() {
        let report = RunReport::new();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"state\": \"START\""));
        assert!(!json.contains("finished_at"));
    }
}
