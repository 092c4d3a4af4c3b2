//! Processor→control-plane report payloads.
//!
//! Both payloads are signed over their raw JSON bytes; see
//! [`crate::signature`]. The completion payload is the authoritative terminal
//! report: the first one accepted for a job wins.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::processing_job::ProcessingStage;

/// Outcome of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportOutcome {
    Success,
    Failure,
}

/// Mid-run progress callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressReport {
    /// Sanitized tour name the processor derived from the inbox key
    pub target_name: String,
    pub stage: ProcessingStage,
    /// 0-100; the receiver clamps this to be monotonic per job
    pub percent: i16,
    pub message: String,
}

/// Terminal completion/failure callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompletionReport {
    /// Sanitized tour name the processor derived from the inbox key
    pub target_name: String,
    /// Durable content id, when the processor knows it (updates); the
    /// receiver mints one on first publish otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    pub outcome: ReportOutcome,
    /// Public prefix the entries were republished under (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_prefix: Option<String>,
    /// Failure detail (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Stage reached when the run ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ProcessingStage>,
    /// Wall-clock duration of the run in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_report_serialization_omits_empty_fields() {
        let report = CompletionReport {
            target_name: "museum".to_string(),
            content_id: None,
            outcome: ReportOutcome::Failure,
            storage_prefix: None,
            error_message: Some("corrupt archive".to_string()),
            stage: Some(ProcessingStage::Extracting),
            duration_ms: None,
        };
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["stage"], "extracting");
        assert!(json.get("content_id").is_none());
        assert!(json.get("storage_prefix").is_none());
    }

    #[test]
    fn test_progress_report_roundtrip() {
        let report = ProgressReport {
            target_name: "museum".to_string(),
            stage: ProcessingStage::Uploading,
            percent: 70,
            message: "Republishing entries".to_string(),
        };
        let json = serde_json::to_string(&report).expect("serialize");
        let back: ProgressReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.stage, ProcessingStage::Uploading);
        assert_eq!(back.percent, 70);
    }
}
