//! Data models for the review service.
//!
//! Row types derive `FromRow` for SQLx queries; wire types derive `Serialize`
//! and `Deserialize` with the field names API clients use.

pub mod pull_request;
pub mod team;
pub mod user;

// Re-exports for convenient access
pub use pull_request::{
    NewPullRequest, PullRequest, PullRequestPatch, PullRequestRecord, PullRequestShort,
    PullRequestStatus, Reassignment,
};
pub use team::{Team, TeamMember};
pub use user::{User, UserPatch, UserReviews};
