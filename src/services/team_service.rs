//! Team management: creating teams with their rosters and reading them back.

use crate::db::{teams, users, RepoError, Transactor};
use crate::error::AppError;
use crate::models::{Team, TeamMember, User};
use crate::services::not_found_as;
use sqlx::SqliteConnection;

/// Creates and reads teams.
#[derive(Debug, Clone)]
pub struct TeamService {
    transactor: Transactor,
}

impl TeamService {
    pub fn new(transactor: Transactor) -> Self {
        Self { transactor }
    }

    /// Create a team and upsert its members in one transaction.
    ///
    /// Fails with `TeamExists` if the name is taken; nothing is written then.
    pub async fn add_team(&self, team: Team) -> Result<Team, AppError> {
        log::info!(
            "adding team '{}' with {} members",
            team.team_name,
            team.members.len()
        );

        let created = self
            .transactor
            .run(move |conn| Box::pin(add_team_in_tx(conn, team)))
            .await?;

        log::info!("team '{}' created", created.team_name);
        Ok(created)
    }

    /// Upsert members into an existing team.
    pub async fn add_members(
        &self,
        team_name: String,
        members: Vec<TeamMember>,
    ) -> Result<Team, AppError> {
        log::info!(
            "adding {} members to team '{}'",
            members.len(),
            team_name
        );

        self.transactor
            .run(move |conn| Box::pin(add_members_in_tx(conn, team_name, members)))
            .await
    }

    /// Fetch a team with its members ordered by user id.
    pub async fn get_team(&self, team_name: String) -> Result<Team, AppError> {
        log::debug!("getting team '{}'", team_name);

        self.transactor
            .run_read_only(move |conn| Box::pin(get_team_in_tx(conn, team_name)))
            .await
    }
}

/// Create the team row, then upsert every member into it.
pub async fn add_team_in_tx(conn: &mut SqliteConnection, team: Team) -> Result<Team, AppError> {
    match teams::create(conn, &team.team_name).await {
        Ok(()) => {}
        Err(RepoError::AlreadyExists) => {
            log::warn!("team '{}' already exists", team.team_name);
            return Err(AppError::team_exists(&team.team_name));
        }
        Err(err) => return Err(err.into()),
    }

    upsert_members(conn, &team.team_name, &team.members).await?;
    get_team_in_tx(conn, team.team_name).await
}

/// Upsert members into `team_name`, which must already exist.
pub async fn add_members_in_tx(
    conn: &mut SqliteConnection,
    team_name: String,
    members: Vec<TeamMember>,
) -> Result<Team, AppError> {
    teams::get(conn, &team_name)
        .await
        .map_err(not_found_as("team", &team_name))?;

    upsert_members(conn, &team_name, &members).await?;
    get_team_in_tx(conn, team_name).await
}

pub async fn get_team_in_tx(
    conn: &mut SqliteConnection,
    team_name: String,
) -> Result<Team, AppError> {
    let mut team = teams::get(conn, &team_name)
        .await
        .map_err(not_found_as("team", &team_name))?;

    team.members = teams::members(conn, &team.team_name).await?;
    Ok(team)
}

async fn upsert_members(
    conn: &mut SqliteConnection,
    team_name: &str,
    members: &[TeamMember],
) -> Result<(), AppError> {
    for member in members {
        users::upsert(conn, &User::from_member(member, team_name))
            .await
            .map_err(|err| {
                log::error!(
                    "failed to upsert user '{}' into team '{}': {}",
                    member.user_id,
                    team_name,
                    err
                );
                AppError::from(err)
            })?;
    }
    Ok(())
}
