use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Upload session lifecycle status.
///
/// Terminal states (`completed`, `failed`, `expired`) permit no further
/// transitions; repositories enforce this with conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadSessionStatus {
    Created,
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl UploadSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadSessionStatus::Created => "created",
            UploadSessionStatus::Uploading => "uploading",
            UploadSessionStatus::Uploaded => "uploaded",
            UploadSessionStatus::Processing => "processing",
            UploadSessionStatus::Completed => "completed",
            UploadSessionStatus::Failed => "failed",
            UploadSessionStatus::Expired => "expired",
        }
    }

    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadSessionStatus::Completed | UploadSessionStatus::Failed | UploadSessionStatus::Expired
        )
    }
}

impl std::fmt::Display for UploadSessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadSessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(UploadSessionStatus::Created),
            "uploading" => Ok(UploadSessionStatus::Uploading),
            "uploaded" => Ok(UploadSessionStatus::Uploaded),
            "processing" => Ok(UploadSessionStatus::Processing),
            "completed" => Ok(UploadSessionStatus::Completed),
            "failed" => Ok(UploadSessionStatus::Failed),
            "expired" => Ok(UploadSessionStatus::Expired),
            other => Err(format!("Unknown upload session status: {}", other)),
        }
    }
}

/// Request to issue a scoped direct-to-storage upload grant
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct UploadGrantRequest {
    /// Logical tour name (required for new content; derived from the
    /// existing content for updates)
    #[validate(length(max = 255, message = "Target name must be at most 255 characters"))]
    pub target_name: Option<String>,
    /// Content id of the published tour being replaced (updates only)
    pub existing_content_id: Option<String>,
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// File size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size: i64,
    /// Content type the client will send with the PUT
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub file_type: String,
    /// Whether this upload replaces an existing published tour
    #[serde(default)]
    pub is_update: bool,
}

/// Response containing the presigned upload descriptor
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadGrantResponse {
    /// Session id (used to report upload completion and poll progress)
    pub session_id: Uuid,
    /// Presigned URL for the direct PUT upload
    pub upload_url: String,
    /// Headers the client must send with the PUT
    pub required_headers: serde_json::Value,
    /// Storage key the archive will land at
    pub object_key: String,
    /// Grant expiration time
    pub expires_at: DateTime<Utc>,
}

/// Client notice that the direct upload finished
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteUploadRequest {
    /// Session id from the grant response
    pub session_id: Uuid,
}

/// Response after the completion notice was accepted
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteUploadResponse {
    /// Processing job tracking the extraction/republish work
    pub job_id: Uuid,
    /// Session status after the notice
    pub status: UploadSessionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            UploadSessionStatus::Created,
            UploadSessionStatus::Uploading,
            UploadSessionStatus::Uploaded,
            UploadSessionStatus::Processing,
            UploadSessionStatus::Completed,
            UploadSessionStatus::Failed,
            UploadSessionStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<UploadSessionStatus>(), Ok(status));
        }
        assert!("bogus".parse::<UploadSessionStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(UploadSessionStatus::Completed.is_terminal());
        assert!(UploadSessionStatus::Failed.is_terminal());
        assert!(UploadSessionStatus::Expired.is_terminal());
        assert!(!UploadSessionStatus::Processing.is_terminal());
        assert!(!UploadSessionStatus::Created.is_terminal());
    }
}
