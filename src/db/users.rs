//! User queries.

use crate::db::RepoError;
use crate::models::{User, UserPatch};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const USER_COLUMNS: &str = "id, username, team_name, is_active";

/// Fetch a user by id.
pub async fn get(conn: &mut SqliteConnection, user_id: &str) -> Result<User, RepoError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepoError::NotFound)
}

/// The full roster of the team `user_id` belongs to, ordered by user id.
///
/// Fails with `NotFound` if the user does not exist or has no team.
pub async fn team_roster(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<User>, RepoError> {
    let roster = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE team_name = (SELECT team_name FROM users WHERE id = ?) ORDER BY id",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    if roster.is_empty() {
        return Err(RepoError::NotFound);
    }
    Ok(roster)
}

/// Insert a user or overwrite its name, active flag and team.
///
/// Fails with `NotFound` if the team does not exist.
pub async fn upsert(conn: &mut SqliteConnection, user: &User) -> Result<User, RepoError> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (id, username, team_name, is_active)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            team_name = excluded.team_name,
            is_active = excluded.is_active
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(&user.user_id)
    .bind(&user.username)
    .bind(&user.team_name)
    .bind(user.is_active)
    .fetch_one(conn)
    .await
    .map_err(RepoError::from_write)
}

/// Apply a partial update and return the resulting row.
///
/// Only fields set in `patch` are written; an empty patch just reads the row.
pub async fn patch(
    conn: &mut SqliteConnection,
    user_id: &str,
    patch: &UserPatch,
) -> Result<User, RepoError> {
    if patch.is_empty() {
        return get(conn, user_id).await;
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(is_active) = patch.is_active {
            set.push("is_active = ").push_bind_unseparated(is_active);
        }
    }
    qb.push(" WHERE id = ").push_bind(user_id);
    qb.push(" RETURNING ").push(USER_COLUMNS);

    qb.build_query_as::<User>()
        .fetch_optional(conn)
        .await
        .map_err(RepoError::from_write)?
        .ok_or(RepoError::NotFound)
}
