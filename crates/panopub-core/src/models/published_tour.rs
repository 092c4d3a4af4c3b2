use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// Published tour status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TourStatus {
    Completed,
    Processing,
    Failed,
}

impl TourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Completed => "completed",
            TourStatus::Processing => "processing",
            TourStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TourStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TourStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TourStatus::Completed),
            "processing" => Ok(TourStatus::Processing),
            "failed" => Ok(TourStatus::Failed),
            other => Err(format!("Unknown tour status: {}", other)),
        }
    }
}

/// Published tour as returned by the read API.
///
/// `content_id` is the durable identity; `slug` is a routing alias and must
/// never be used as a storage key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishedTourResponse {
    pub content_id: String,
    pub slug: String,
    pub storage_prefix: String,
    pub status: TourStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

/// Request to change a tour's slug.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangeSlugRequest {
    /// New URL-facing slug
    #[validate(length(min = 1, max = 255, message = "Slug must be between 1 and 255 characters"))]
    pub slug: String,
}
