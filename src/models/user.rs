//! User model.

use super::pull_request::PullRequestShort;
use super::team::TeamMember;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Externally supplied user id.
    #[sqlx(rename = "id")]
    pub user_id: String,

    /// Display name.
    pub username: String,

    /// Team membership, if any.
    pub team_name: Option<String>,

    /// Inactive users are never picked as reviewers.
    pub is_active: bool,
}

impl User {
    /// A user joining `team_name` from a submitted roster entry.
    pub fn from_member(member: &TeamMember, team_name: &str) -> Self {
        Self {
            user_id: member.user_id.clone(),
            username: member.username.clone(),
            team_name: Some(team_name.to_string()),
            is_active: member.is_active,
        }
    }
}

/// Partial update of a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub is_active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none()
    }
}

/// Pull requests a user is currently reviewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReviews {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}
