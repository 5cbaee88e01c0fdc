//! User status management.

use crate::db::{users, Transactor};
use crate::error::AppError;
use crate::models::{User, UserPatch};
use crate::services::not_found_as;

/// Toggles user activity.
#[derive(Debug, Clone)]
pub struct UserService {
    transactor: Transactor,
}

impl UserService {
    pub fn new(transactor: Transactor) -> Self {
        Self { transactor }
    }

    /// Set only the active flag of a user and return the updated user.
    ///
    /// Existing review assignments are left in place; inactivity only
    /// matters when reviewers are selected.
    pub async fn set_user_is_active(
        &self,
        user_id: String,
        is_active: bool,
    ) -> Result<User, AppError> {
        log::info!("setting user '{}' active={}", user_id, is_active);

        let patch = UserPatch {
            is_active: Some(is_active),
        };

        self.transactor
            .run(move |conn| {
                Box::pin(async move {
                    users::patch(conn, &user_id, &patch)
                        .await
                        .map_err(not_found_as("user", &user_id))
                })
            })
            .await
    }
}
