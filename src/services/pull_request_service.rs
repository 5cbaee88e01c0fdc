//! Pull request lifecycle: creation with automatic reviewers, merging,
//! reviewer reassignment and per-reviewer listings.
//!
//! Every mutating operation runs as one unit of work. Checks happen before
//! writes, and any error rolls the whole unit back.

use crate::db::{pull_requests, reviews, users, RepoError, Transactor};
use crate::error::AppError;
use crate::models::{
    NewPullRequest, PullRequest, PullRequestPatch, PullRequestStatus, Reassignment, UserReviews,
};
use crate::services::not_found_as;
use crate::services::selection::{select_replacement, select_reviewers, MAX_REVIEWERS};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// Drives the pull request state machine (`OPEN` to `MERGED`).
#[derive(Debug, Clone)]
pub struct PullRequestService {
    transactor: Transactor,
}

impl PullRequestService {
    pub fn new(transactor: Transactor) -> Self {
        Self { transactor }
    }

    /// Create an OPEN pull request and assign up to two reviewers from the
    /// author's team.
    pub async fn create(&self, new_pr: NewPullRequest) -> Result<PullRequest, AppError> {
        log::info!(
            "creating pull request '{}' by '{}'",
            new_pr.pull_request_id,
            new_pr.author_id
        );

        let now = Utc::now();
        let pr = self
            .transactor
            .run(move |conn| Box::pin(create_in_tx(conn, new_pr, now)))
            .await?;

        log::info!(
            "pull request '{}' created with reviewers {:?}",
            pr.pull_request_id,
            pr.assigned_reviewers
        );
        Ok(pr)
    }

    /// Mark a pull request as merged. Merging again returns the merged pull
    /// request unchanged.
    pub async fn merge(&self, pr_id: String) -> Result<PullRequest, AppError> {
        log::info!("merging pull request '{}'", pr_id);

        let now = Utc::now();
        self.transactor
            .run(move |conn| Box::pin(merge_in_tx(conn, pr_id, now)))
            .await
    }

    /// Replace `old_reviewer_id` with another active member of their team.
    pub async fn reassign(
        &self,
        pr_id: String,
        old_reviewer_id: String,
    ) -> Result<Reassignment, AppError> {
        log::info!(
            "reassigning reviewer '{}' on pull request '{}'",
            old_reviewer_id,
            pr_id
        );

        let result = self
            .transactor
            .run(move |conn| Box::pin(reassign_in_tx(conn, pr_id, old_reviewer_id)))
            .await?;

        log::info!(
            "pull request '{}' reassigned to '{}'",
            result.pr.pull_request_id,
            result.replaced_by
        );
        Ok(result)
    }

    /// Pull requests the user currently reviews. Unknown users simply have
    /// none.
    pub async fn get_user_review(&self, user_id: String) -> Result<UserReviews, AppError> {
        log::debug!("getting reviews for user '{}'", user_id);

        self.transactor
            .run_read_only(move |conn| {
                Box::pin(async move {
                    let pull_requests = reviews::pull_requests_for_reviewer(conn, &user_id)
                        .await
                        .map_err(|err| {
                            log::error!("failed to list reviews of '{}': {}", user_id, err);
                            AppError::from(err)
                        })?;

                    Ok(UserReviews {
                        user_id,
                        pull_requests,
                    })
                })
            })
            .await
    }
}

pub async fn create_in_tx(
    conn: &mut SqliteConnection,
    new_pr: NewPullRequest,
    now: DateTime<Utc>,
) -> Result<PullRequest, AppError> {
    let author_id = new_pr.author_id.as_str();

    let roster = users::team_roster(conn, author_id)
        .await
        .map_err(not_found_as("author", author_id))?;

    let author_active = roster
        .iter()
        .find(|member| member.user_id == author_id)
        .map(|member| member.is_active)
        .ok_or_else(|| AppError::not_found_with_id("author", author_id))?;

    if !author_active {
        log::warn!("inactive user '{}' cannot create pull requests", author_id);
        return Err(AppError::user_inactive(author_id));
    }

    let record = match pull_requests::create(conn, &new_pr, now).await {
        Ok(record) => record,
        Err(RepoError::AlreadyExists) => {
            log::warn!("pull request '{}' already exists", new_pr.pull_request_id);
            return Err(AppError::pr_exists(&new_pr.pull_request_id));
        }
        Err(RepoError::NotFound) => {
            log::warn!("author '{}' not found", author_id);
            return Err(AppError::not_found_with_id("author", author_id));
        }
        Err(err) => return Err(err.into()),
    };

    let reviewers = select_reviewers(author_id, &roster, MAX_REVIEWERS);
    if reviewers.is_empty() {
        log::info!("no eligible reviewers for pull request '{}'", record.id);
    }

    for reviewer_id in &reviewers {
        reviews::assign(conn, &record.id, reviewer_id).await?;
    }

    Ok(PullRequest::from_record(record, reviewers))
}

pub async fn merge_in_tx(
    conn: &mut SqliteConnection,
    pr_id: String,
    now: DateTime<Utc>,
) -> Result<PullRequest, AppError> {
    let record = pull_requests::patch(conn, &pr_id, &PullRequestPatch::merged(), now)
        .await
        .map_err(not_found_as("pull request", &pr_id))?;

    let reviewers = reviews::reviewer_ids(conn, &record.id).await?;
    Ok(PullRequest::from_record(record, reviewers))
}

pub async fn reassign_in_tx(
    conn: &mut SqliteConnection,
    pr_id: String,
    old_reviewer_id: String,
) -> Result<Reassignment, AppError> {
    let roster = users::team_roster(conn, &old_reviewer_id)
        .await
        .map_err(not_found_as("user", &old_reviewer_id))?;

    let record = pull_requests::get(conn, &pr_id)
        .await
        .map_err(not_found_as("pull request", &pr_id))?;

    if record.status == PullRequestStatus::Merged {
        log::warn!("cannot reassign merged pull request '{}'", pr_id);
        return Err(AppError::pr_merged(&pr_id));
    }

    let current = reviews::reviewer_ids(conn, &pr_id).await?;
    if !current.contains(&old_reviewer_id) {
        log::warn!(
            "user '{}' is not a reviewer of pull request '{}'",
            old_reviewer_id,
            pr_id
        );
        return Err(AppError::not_assigned(&pr_id, &old_reviewer_id));
    }

    let replacement = select_replacement(&record.author_id, &current, &roster).ok_or_else(|| {
        log::warn!("no replacement candidate for pull request '{}'", pr_id);
        AppError::no_candidate(&pr_id)
    })?;

    reviews::unassign(conn, &pr_id, &old_reviewer_id)
        .await
        .map_err(|err| match err {
            RepoError::NotFound => AppError::not_assigned(&pr_id, &old_reviewer_id),
            other => other.into(),
        })?;
    reviews::assign(conn, &pr_id, &replacement).await?;

    let reviewers = reviews::reviewer_ids(conn, &pr_id).await?;
    Ok(Reassignment {
        pr: PullRequest::from_record(record, reviewers),
        replaced_by: replacement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;
    use crate::db::DbPool;
    use crate::error::ErrorCode;
    use crate::models::{Team, TeamMember};
    use crate::services::{TeamService, UserService};

    struct Fixture {
        _dir: tempfile::TempDir,
        pool: DbPool,
        teams: TeamService,
        users: UserService,
        prs: PullRequestService,
    }

    async fn fixture(members: &[(&str, bool)]) -> Fixture {
        let (dir, pool) = migrated_pool().await;
        let transactor = Transactor::new(pool.clone());
        let teams = TeamService::new(transactor.clone());
        teams
            .add_team(Team {
                team_name: "backend".into(),
                members: members
                    .iter()
                    .map(|(id, active)| TeamMember {
                        user_id: id.to_string(),
                        username: id.to_string(),
                        is_active: *active,
                    })
                    .collect(),
            })
            .await
            .unwrap();

        Fixture {
            _dir: dir,
            pool,
            teams,
            users: UserService::new(transactor.clone()),
            prs: PullRequestService::new(transactor),
        }
    }

    fn new_pr(id: &str, author: &str) -> NewPullRequest {
        NewPullRequest {
            pull_request_id: id.into(),
            pull_request_name: "feat".into(),
            author_id: author.into(),
        }
    }

    async fn count(pool: &DbPool, table: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_create_assigns_two_reviewers() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]).await;

        let pr = f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        assert_eq!(pr.status, PullRequestStatus::Open);
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u3"]);
        assert!(pr.created_at.is_some());
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_create_with_short_roster() {
        let f = fixture(&[("u1", true), ("u2", false), ("u3", true)]).await;
        let pr = f.prs.create(new_pr("pr-1", "u1")).await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["u3"]);

        let solo = fixture(&[("u1", true)]).await;
        let pr = solo.prs.create(new_pr("pr-1", "u1")).await.unwrap();
        assert!(pr.assigned_reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_inactive_author() {
        let f = fixture(&[("u1", false), ("u2", true)]).await;

        let err = f.prs.create(new_pr("pr-1", "u1")).await.unwrap_err();

        assert_eq!(err, AppError::user_inactive("u1"));
        assert_eq!(count(&f.pool, "pull_requests").await, 0);
    }

    #[tokio::test]
    async fn test_create_with_unknown_author() {
        let f = fixture(&[("u1", true)]).await;

        let err = f.prs.create(new_pr("pr-1", "ghost")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_create_duplicate_keeps_original() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let err = f.prs.create(new_pr("pr-1", "u2")).await.unwrap_err();

        assert_eq!(err, AppError::pr_exists("pr-1"));
        assert_eq!(count(&f.pool, "reviews").await, 2);
    }

    #[tokio::test]
    async fn test_merge() {
        let f = fixture(&[("u1", true), ("u2", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let merged = f.prs.merge("pr-1".into()).await.unwrap();
        assert_eq!(merged.status, PullRequestStatus::Merged);
        assert_eq!(merged.assigned_reviewers, vec!["u2"]);
        let merged_at = merged.merged_at.unwrap();

        let again = f.prs.merge("pr-1".into()).await.unwrap();
        assert_eq!(again.status, PullRequestStatus::Merged);
        assert_eq!(again.merged_at, Some(merged_at));
    }

    #[tokio::test]
    async fn test_merge_missing() {
        let f = fixture(&[("u1", true)]).await;

        let err = f.prs.merge("nope".into()).await.unwrap_err();
        assert_eq!(err, AppError::not_found_with_id("pull request", "nope"));
    }

    #[tokio::test]
    async fn test_reassign_merged_pull_request() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();
        f.prs.merge("pr-1".into()).await.unwrap();

        let err = f
            .prs
            .reassign("pr-1".into(), "u2".into())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::pr_merged("pr-1"));

        // Not a reviewer either; merged still wins
        let err = f
            .prs
            .reassign("pr-1".into(), "u4".into())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrMerged);
    }

    #[tokio::test]
    async fn test_reassign_not_assigned_leaves_reviewers() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let err = f
            .prs
            .reassign("pr-1".into(), "u4".into())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::not_assigned("pr-1", "u4"));

        let reviews = f.prs.get_user_review("u2".into()).await.unwrap();
        assert_eq!(reviews.pull_requests.len(), 1);
        assert!(f
            .prs
            .get_user_review("u4".into())
            .await
            .unwrap()
            .pull_requests
            .is_empty());
    }

    #[tokio::test]
    async fn test_reassign_without_candidate() {
        let f = fixture(&[("u1", true), ("u2", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let err = f
            .prs
            .reassign("pr-1".into(), "u2".into())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::no_candidate("pr-1"));
        assert_eq!(count(&f.pool, "reviews").await, 1);
    }

    #[tokio::test]
    async fn test_reassign_picks_active_replacement() {
        let f = fixture(&[
            ("u1", true),
            ("u2", true),
            ("u3", true),
            ("u4", false),
            ("u5", true),
        ])
        .await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let result = f.prs.reassign("pr-1".into(), "u2".into()).await.unwrap();

        assert_eq!(result.replaced_by, "u5");
        assert_eq!(result.pr.assigned_reviewers, vec!["u3", "u5"]);
        assert_eq!(result.pr.status, PullRequestStatus::Open);
    }

    #[tokio::test]
    async fn test_reassign_unknown_user_or_pull_request() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        let err = f
            .prs
            .reassign("pr-1".into(), "ghost".into())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = f
            .prs
            .reassign("nope".into(), "u2".into())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::not_found_with_id("pull request", "nope"));
    }

    #[tokio::test]
    async fn test_deactivated_reviewer_keeps_assignment() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        f.users.set_user_is_active("u2".into(), false).await.unwrap();

        let reviews = f.prs.get_user_review("u2".into()).await.unwrap();
        assert_eq!(reviews.pull_requests.len(), 1);
        assert_eq!(reviews.pull_requests[0].pull_request_id, "pr-1");
    }

    #[tokio::test]
    async fn test_get_user_review() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();
        f.prs.create(new_pr("pr-2", "u3")).await.unwrap();
        f.prs.merge("pr-1".into()).await.unwrap();

        let reviews = f.prs.get_user_review("u2".into()).await.unwrap();

        assert_eq!(reviews.user_id, "u2");
        let listed: Vec<(&str, PullRequestStatus)> = reviews
            .pull_requests
            .iter()
            .map(|p| (p.pull_request_id.as_str(), p.status))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("pr-1", PullRequestStatus::Merged),
                ("pr-2", PullRequestStatus::Open)
            ]
        );

        let nobody = f.prs.get_user_review("ghost".into()).await.unwrap();
        assert!(nobody.pull_requests.is_empty());
    }

    #[tokio::test]
    async fn test_new_member_becomes_candidate() {
        let f = fixture(&[("u1", true), ("u2", true), ("u3", true)]).await;
        f.prs.create(new_pr("pr-1", "u1")).await.unwrap();

        f.teams
            .add_members(
                "backend".into(),
                vec![TeamMember {
                    user_id: "u4".into(),
                    username: "u4".into(),
                    is_active: true,
                }],
            )
            .await
            .unwrap();

        let result = f.prs.reassign("pr-1".into(), "u2".into()).await.unwrap();
        assert_eq!(result.pr.assigned_reviewers, vec!["u3", "u4"]);
    }
}
