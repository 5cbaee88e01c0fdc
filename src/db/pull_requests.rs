//! Pull request queries.

use crate::db::RepoError;
use crate::models::{NewPullRequest, PullRequestPatch, PullRequestRecord, PullRequestStatus};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const PR_COLUMNS: &str = "id, name, author_id, status, need_more_reviewers, created_at, merged_at";

/// Insert an OPEN pull request.
///
/// Fails with `AlreadyExists` if the id is taken and `NotFound` if the
/// author does not exist.
pub async fn create(
    conn: &mut SqliteConnection,
    new_pr: &NewPullRequest,
    created_at: DateTime<Utc>,
) -> Result<PullRequestRecord, RepoError> {
    sqlx::query_as::<_, PullRequestRecord>(&format!(
        r#"
        INSERT INTO pull_requests (id, name, author_id, status, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        PR_COLUMNS
    ))
    .bind(&new_pr.pull_request_id)
    .bind(&new_pr.pull_request_name)
    .bind(&new_pr.author_id)
    .bind(PullRequestStatus::Open)
    .bind(created_at)
    .fetch_one(conn)
    .await
    .map_err(RepoError::from_write)
}

/// Fetch a pull request by id.
pub async fn get(
    conn: &mut SqliteConnection,
    pr_id: &str,
) -> Result<PullRequestRecord, RepoError> {
    sqlx::query_as::<_, PullRequestRecord>(&format!(
        "SELECT {} FROM pull_requests WHERE id = ?",
        PR_COLUMNS
    ))
    .bind(pr_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepoError::NotFound)
}

/// Apply a partial update and return the resulting row.
///
/// Setting the status to MERGED stamps `merged_at` with `now` unless it is
/// already set. A merged pull request cannot be set back to OPEN; that
/// fails with `InvalidTransition`. An empty patch just reads the row.
pub async fn patch(
    conn: &mut SqliteConnection,
    pr_id: &str,
    patch: &PullRequestPatch,
    now: DateTime<Utc>,
) -> Result<PullRequestRecord, RepoError> {
    if patch.status.is_none() && patch.need_more_reviewers.is_none() {
        return get(conn, pr_id).await;
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE pull_requests SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(status) = patch.status {
            set.push("status = ").push_bind_unseparated(status);
            if status == PullRequestStatus::Merged {
                set.push("merged_at = COALESCE(merged_at, ")
                    .push_bind_unseparated(now)
                    .push_unseparated(")");
            }
        }
        if let Some(need_more) = patch.need_more_reviewers {
            set.push("need_more_reviewers = ").push_bind_unseparated(need_more);
        }
    }
    qb.push(" WHERE id = ").push_bind(pr_id);
    if patch.status == Some(PullRequestStatus::Open) {
        qb.push(" AND status = ").push_bind(PullRequestStatus::Open);
    }
    qb.push(" RETURNING ").push(PR_COLUMNS);

    let updated = qb
        .build_query_as::<PullRequestRecord>()
        .fetch_optional(&mut *conn)
        .await
        .map_err(RepoError::from_write)?;

    match updated {
        Some(record) => Ok(record),
        // Either the row is missing or the status guard rejected it
        None => {
            let current = get(conn, pr_id).await?;
            Err(RepoError::InvalidTransition(format!(
                "pull request '{}' is {} and cannot become {}",
                pr_id,
                current.status,
                PullRequestStatus::Open
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;
    use crate::db::{teams, users};
    use crate::models::User;

    async fn seed_author(conn: &mut SqliteConnection) {
        teams::create(conn, "backend").await.unwrap();
        users::upsert(
            conn,
            &User {
                user_id: "u1".into(),
                username: "alice".into(),
                team_name: Some("backend".into()),
                is_active: true,
            },
        )
        .await
        .unwrap();
    }

    fn new_pr(id: &str, author: &str) -> NewPullRequest {
        NewPullRequest {
            pull_request_id: id.into(),
            pull_request_name: "feat".into(),
            author_id: author.into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;

        let now = Utc::now();
        let created = create(&mut conn, &new_pr("pr-1", "u1"), now).await.unwrap();

        assert_eq!(created.status, PullRequestStatus::Open);
        assert_eq!(created.created_at, now);
        assert!(created.merged_at.is_none());
        assert!(!created.need_more_reviewers);
        assert_eq!(get(&mut conn, "pr-1").await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_conflicts() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;

        create(&mut conn, &new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let dup = create(&mut conn, &new_pr("pr-1", "u1"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(dup, RepoError::AlreadyExists));

        let orphan = create(&mut conn, &new_pr("pr-2", "ghost"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(orphan, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_merge_patch_sets_merged_at_once() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;
        create(&mut conn, &new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let first_merge = Utc::now();
        let merged = patch(&mut conn, "pr-1", &PullRequestPatch::merged(), first_merge)
            .await
            .unwrap();
        assert_eq!(merged.status, PullRequestStatus::Merged);
        assert_eq!(merged.merged_at, Some(first_merge));

        let later = first_merge + chrono::Duration::seconds(60);
        let again = patch(&mut conn, "pr-1", &PullRequestPatch::merged(), later)
            .await
            .unwrap();
        assert_eq!(again.merged_at, Some(first_merge));
    }

    #[tokio::test]
    async fn test_patch_need_more_reviewers_leaves_status() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;
        create(&mut conn, &new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let patched = patch(
            &mut conn,
            "pr-1",
            &PullRequestPatch {
                need_more_reviewers: Some(true),
                ..PullRequestPatch::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(patched.need_more_reviewers);
        assert_eq!(patched.status, PullRequestStatus::Open);
        assert!(patched.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_merged_cannot_reopen() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;
        create(&mut conn, &new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let merged = patch(&mut conn, "pr-1", &PullRequestPatch::merged(), Utc::now())
            .await
            .unwrap();

        let reopen = PullRequestPatch {
            status: Some(PullRequestStatus::Open),
            ..PullRequestPatch::default()
        };
        let err = patch(&mut conn, "pr-1", &reopen, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidTransition(_)));

        // Row is untouched
        assert_eq!(get(&mut conn, "pr-1").await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_open_patch_on_open_pull_request() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        seed_author(&mut conn).await;
        create(&mut conn, &new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let reopen = PullRequestPatch {
            status: Some(PullRequestStatus::Open),
            need_more_reviewers: Some(true),
        };
        let patched = patch(&mut conn, "pr-1", &reopen, Utc::now()).await.unwrap();

        assert_eq!(patched.status, PullRequestStatus::Open);
        assert!(patched.need_more_reviewers);

        let missing = patch(&mut conn, "nope", &reopen, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(missing, RepoError::NotFound));
    }

    #[tokio::test]
    async fn test_patch_missing_is_not_found() {
        let (_dir, pool) = migrated_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = patch(&mut conn, "nope", &PullRequestPatch::merged(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }
}
