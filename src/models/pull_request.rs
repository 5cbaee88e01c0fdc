//! Pull request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a pull request. `Open` may become `Merged`, never the
/// reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    Open,
    Merged,
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Merged => write!(f, "MERGED"),
        }
    }
}

/// A row of the `pull_requests` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PullRequestRecord {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub status: PullRequestStatus,

    /// Set when the pull request asks for more reviewers than were found.
    pub need_more_reviewers: bool,

    pub created_at: DateTime<Utc>,

    /// Set once, on the first merge.
    pub merged_at: Option<DateTime<Utc>>,
}

/// A pull request with its assigned reviewers, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PullRequestStatus,

    /// Reviewer ids in assignment order.
    pub assigned_reviewers: Vec<String>,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "mergedAt", default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn from_record(record: PullRequestRecord, assigned_reviewers: Vec<String>) -> Self {
        Self {
            pull_request_id: record.id,
            pull_request_name: record.name,
            author_id: record.author_id,
            status: record.status,
            assigned_reviewers,
            created_at: Some(record.created_at),
            merged_at: record.merged_at,
        }
    }
}

/// Pull request summary used in review listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PullRequestShort {
    #[sqlx(rename = "id")]
    pub pull_request_id: String,

    #[sqlx(rename = "name")]
    pub pull_request_name: String,

    pub author_id: String,
    pub status: PullRequestStatus,
}

/// Input for creating a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

/// Partial update of a pull request. `None` leaves the column untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullRequestPatch {
    pub status: Option<PullRequestStatus>,
    pub need_more_reviewers: Option<bool>,
}

impl PullRequestPatch {
    /// Patch that marks a pull request as merged.
    pub fn merged() -> Self {
        Self {
            status: Some(PullRequestStatus::Merged),
            ..Self::default()
        }
    }
}

/// Result of replacing a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}
