//! Application error types for the review services.
//!
//! Every service operation returns either its value or an [`AppError`].
//! The HTTP layer turns an error into an [`ErrorBody`] (`{code, message}`)
//! and picks the status code from [`AppError::code`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine-readable error codes sent to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TeamExists,
    PrExists,
    PrMerged,
    NotAssigned,
    NoCandidate,
    NotFound,
    UserInactive,
    Unspecified,
    InvalidBody,
    Unauthorized,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamExists => "TEAM_EXISTS",
            Self::PrExists => "PR_EXISTS",
            Self::PrMerged => "PR_MERGED",
            Self::NotAssigned => "NOT_ASSIGNED",
            Self::NoCandidate => "NO_CANDIDATE",
            Self::NotFound => "NOT_FOUND",
            Self::UserInactive => "USER_INACTIVE",
            Self::Unspecified => "UNSPECIFIED",
            Self::InvalidBody => "INVALID_BODY",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level errors returned by the team, user and pull request services.
///
/// Business-rule violations get their own variant. Infrastructure failures are
/// collapsed into [`AppError::Unspecified`] so storage details never reach
/// the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Team name is already taken.
    #[error("team '{team_name}' already exists")]
    TeamExists { team_name: String },

    /// Pull request id is already taken.
    #[error("pull request '{pr_id}' already exists")]
    PrExists { pr_id: String },

    /// Operation is not permitted once the pull request is merged.
    #[error("cannot reassign on merged pull request '{pr_id}'")]
    PrMerged { pr_id: String },

    /// The user is not a current reviewer of the pull request.
    #[error("user '{user_id}' is not assigned to pull request '{pr_id}'")]
    NotAssigned { pr_id: String, user_id: String },

    /// Nobody in the team can take over the review.
    #[error("no active replacement candidate in team for pull request '{pr_id}'")]
    NoCandidate { pr_id: String },

    /// Referenced team, user or pull request does not exist.
    #[error("{resource} not found")]
    NotFound { resource: String, id: Option<String> },

    /// Inactive authors cannot open pull requests.
    #[error("inactive user '{user_id}' cannot create pull requests")]
    UserInactive { user_id: String },

    /// Request body could not be decoded or failed validation.
    #[error("invalid request body: {message}")]
    InvalidBody {
        message: String,
        field: Option<String>,
    },

    /// Missing, invalid or insufficient API token.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Unclassified persistence or internal failure.
    #[error("{message}")]
    Unspecified { message: String },
}

impl AppError {
    /// Create a team exists error.
    pub fn team_exists(team_name: impl Into<String>) -> Self {
        Self::TeamExists {
            team_name: team_name.into(),
        }
    }

    /// Create a pull request exists error.
    pub fn pr_exists(pr_id: impl Into<String>) -> Self {
        Self::PrExists {
            pr_id: pr_id.into(),
        }
    }

    /// Create a merged pull request error.
    pub fn pr_merged(pr_id: impl Into<String>) -> Self {
        Self::PrMerged {
            pr_id: pr_id.into(),
        }
    }

    /// Create a not assigned error.
    pub fn not_assigned(pr_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::NotAssigned {
            pr_id: pr_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Create a no candidate error.
    pub fn no_candidate(pr_id: impl Into<String>) -> Self {
        Self::NoCandidate {
            pr_id: pr_id.into(),
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    /// Create a user inactive error.
    pub fn user_inactive(user_id: impl Into<String>) -> Self {
        Self::UserInactive {
            user_id: user_id.into(),
        }
    }

    /// Create an invalid body error.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid body error with field name.
    pub fn invalid_body_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an unspecified error.
    pub fn unspecified(message: impl Into<String>) -> Self {
        Self::Unspecified {
            message: message.into(),
        }
    }

    /// The wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TeamExists { .. } => ErrorCode::TeamExists,
            Self::PrExists { .. } => ErrorCode::PrExists,
            Self::PrMerged { .. } => ErrorCode::PrMerged,
            Self::NotAssigned { .. } => ErrorCode::NotAssigned,
            Self::NoCandidate { .. } => ErrorCode::NoCandidate,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::UserInactive { .. } => ErrorCode::UserInactive,
            Self::InvalidBody { .. } => ErrorCode::InvalidBody,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::Unspecified { .. } => ErrorCode::Unspecified,
        }
    }
}

/// `{code, message}` error payload returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// Conversions from infrastructure error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        log::error!("database error: {}", err);
        Self::unspecified("database operation failed")
    }
}

impl From<crate::db::RepoError> for AppError {
    fn from(err: crate::db::RepoError) -> Self {
        log::error!("repository error: {}", err);
        Self::unspecified("database operation failed")
    }
}
