//! Review assignment queries.
//!
//! A review row links one reviewer to one pull request. Rows keep their
//! insertion order, which is the order reviewers are reported in.

use crate::db::RepoError;
use crate::models::PullRequestShort;
use sqlx::SqliteConnection;

/// Assign `user_id` as a reviewer of `pr_id`.
///
/// Fails with `AlreadyExists` if the user already reviews the pull request
/// and `NotFound` if either side does not exist.
pub async fn assign(
    conn: &mut SqliteConnection,
    pr_id: &str,
    user_id: &str,
) -> Result<(), RepoError> {
    sqlx::query("INSERT INTO reviews (pull_request_id, user_id) VALUES (?, ?)")
        .bind(pr_id)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(RepoError::from_write)?;
    Ok(())
}

/// Remove a reviewer. Fails with `NotFound` if no such assignment exists.
pub async fn unassign(
    conn: &mut SqliteConnection,
    pr_id: &str,
    user_id: &str,
) -> Result<(), RepoError> {
    let result = sqlx::query("DELETE FROM reviews WHERE pull_request_id = ? AND user_id = ?")
        .bind(pr_id)
        .bind(user_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Reviewer ids of a pull request in assignment order.
pub async fn reviewer_ids(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<Vec<String>, RepoError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM reviews WHERE pull_request_id = ? ORDER BY rowid")
            .bind(pr_id)
            .fetch_all(conn)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Pull requests `user_id` currently reviews, in assignment order.
pub async fn pull_requests_for_reviewer(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<PullRequestShort>, RepoError> {
    let prs = sqlx::query_as::<_, PullRequestShort>(
        r#"
        SELECT pr.id, pr.name, pr.author_id, pr.status
        FROM reviews r
        JOIN pull_requests pr ON pr.id = r.pull_request_id
        WHERE r.user_id = ?
        ORDER BY r.rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(prs)
}
