//! Business logic services.
//!
//! This module contains the review workflow (teams, user status, pull request
//! lifecycle and reviewer selection) and the HTTP surface that exposes it.
//!
//! Services own a [`Transactor`](crate::db::Transactor) and are cheap to
//! clone. Each public operation is one unit of work; the `*_in_tx` functions
//! hold the actual steps and can be composed inside a larger unit.

pub mod http_api;
pub mod http_auth;
pub mod http_server;
pub mod pull_request_service;
pub mod selection;
pub mod team_service;
pub mod user_service;

pub use pull_request_service::PullRequestService;
pub use team_service::TeamService;
pub use user_service::UserService;

use crate::db::RepoError;
use crate::error::AppError;

/// Map a repository `NotFound` to a named `NotFound` error; other failures
/// become `Unspecified`.
pub(crate) fn not_found_as<'a>(
    resource: &'a str,
    id: &'a str,
) -> impl FnOnce(RepoError) -> AppError + 'a {
    move |err| match err {
        RepoError::NotFound => {
            log::warn!("{} '{}' not found", resource, id);
            AppError::not_found_with_id(resource, id)
        }
        other => other.into(),
    }
}
