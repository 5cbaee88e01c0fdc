//! Team queries.

use crate::db::RepoError;
use crate::models::{Team, TeamMember};
use sqlx::SqliteConnection;

/// Insert a team. Fails with `AlreadyExists` if the name is taken.
pub async fn create(conn: &mut SqliteConnection, team_name: &str) -> Result<(), RepoError> {
    sqlx::query("INSERT INTO teams (name) VALUES (?)")
        .bind(team_name)
        .execute(conn)
        .await
        .map_err(RepoError::from_write)?;
    Ok(())
}

/// Fetch a team without its members.
pub async fn get(conn: &mut SqliteConnection, team_name: &str) -> Result<Team, RepoError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT name FROM teams WHERE name = ?")
        .bind(team_name)
        .fetch_optional(conn)
        .await?;

    let (name,) = row.ok_or(RepoError::NotFound)?;
    Ok(Team {
        team_name: name,
        members: Vec::new(),
    })
}

/// Members of a team ordered by user id. Empty if the team has no members.
pub async fn members(
    conn: &mut SqliteConnection,
    team_name: &str,
) -> Result<Vec<TeamMember>, RepoError> {
    let rows: Vec<(String, String, bool)> = sqlx::query_as(
        "SELECT id, username, is_active FROM users WHERE team_name = ? ORDER BY id",
    )
    .bind(team_name)
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user_id, username, is_active)| TeamMember {
            user_id,
            username,
            is_active,
        })
        .collect())
}
