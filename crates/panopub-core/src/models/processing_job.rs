use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Pipeline stage reported by the processor.
///
/// Stages advance in declaration order; `percent` is monotonic within a job
/// regardless of callback delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    Downloading,
    Validating,
    Extracting,
    Uploading,
    Invalidating,
    Cleanup,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Downloading => "downloading",
            ProcessingStage::Validating => "validating",
            ProcessingStage::Extracting => "extracting",
            ProcessingStage::Uploading => "uploading",
            ProcessingStage::Invalidating => "invalidating",
            ProcessingStage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloading" => Ok(ProcessingStage::Downloading),
            "validating" => Ok(ProcessingStage::Validating),
            "extracting" => Ok(ProcessingStage::Extracting),
            "uploading" => Ok(ProcessingStage::Uploading),
            "invalidating" => Ok(ProcessingStage::Invalidating),
            "cleanup" => Ok(ProcessingStage::Cleanup),
            other => Err(format!("Unknown processing stage: {}", other)),
        }
    }
}

/// Terminal outcome of a processing job. Unset while the job is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Completed,
    Failed,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalStatus::Completed => "completed",
            TerminalStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TerminalStatus::Completed),
            "failed" => Ok(TerminalStatus::Failed),
            other => Err(format!("Unknown terminal status: {}", other)),
        }
    }
}

/// Read model returned by the progress endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProgressResponse {
    /// Session status (`processing`, `completed`, `failed`, ...)
    pub status: super::UploadSessionStatus,
    /// Last reported pipeline stage, if a job exists
    pub stage: Option<ProcessingStage>,
    /// 0-100, monotonic non-decreasing
    pub percent: i16,
    /// Human-readable progress message
    pub message: String,
    /// Job id, if a job exists
    pub job_id: Option<Uuid>,
    /// Failure detail, present only for failed jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}
