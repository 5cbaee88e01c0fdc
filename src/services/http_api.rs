//! REST API handlers for teams, users and pull requests.
//!
//! Request bodies and query strings are decoded here; every business rule
//! lives in the services. Errors leave as `{"error": {"code", "message"}}`
//! with a status picked from the error code.

use crate::db::Transactor;
use crate::error::{AppError, ErrorBody, ErrorCode};
use crate::models::{NewPullRequest, PullRequest, Reassignment, Team, TeamMember, User, UserReviews};
use crate::services::{PullRequestService, TeamService, UserService};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Shared state for the API routes.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub teams: TeamService,
    pub users: UserService,
    pub pull_requests: PullRequestService,
    pub transactor: Transactor,
}

impl ApiState {
    pub fn new(transactor: Transactor) -> Self {
        Self {
            teams: TeamService::new(transactor.clone()),
            users: UserService::new(transactor.clone()),
            pull_requests: PullRequestService::new(transactor.clone()),
            transactor,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Wrapper to make AppError usable as an axum error response.
pub struct ApiErr(pub AppError);

/// HTTP status for an error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::TeamExists | ErrorCode::InvalidBody => StatusCode::BAD_REQUEST,
        ErrorCode::PrExists
        | ErrorCode::PrMerged
        | ErrorCode::NotAssigned
        | ErrorCode::NoCandidate
        | ErrorCode::UserInactive => StatusCode::CONFLICT,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Unspecified => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": {code, message}}` response with an explicit status.
pub fn error_response(status: StatusCode, err: &AppError) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            error: ErrorBody::from(err),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        error_response(status_for(self.0.code()), &self.0)
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        log::debug!("rejected request body: {}", rejection.body_text());
        Self(AppError::invalid_body(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        log::debug!("rejected query string: {}", rejection.body_text());
        Self(AppError::invalid_body(rejection.body_text()))
    }
}

/// Reject blank required strings.
fn require(value: &str, field: &str) -> Result<(), ApiErr> {
    if value.trim().is_empty() {
        return Err(ApiErr(AppError::invalid_body_field(
            format!("{} must not be empty", field),
            field,
        )));
    }
    Ok(())
}

fn require_members(members: &[TeamMember]) -> Result<(), ApiErr> {
    for member in members {
        require(&member.user_id, "user_id")?;
        require(&member.username, "username")?;
    }
    Ok(())
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AddMembersRequest {
    team_name: String,
    members: Vec<TeamMember>,
}

#[derive(Deserialize)]
struct TeamQuery {
    team_name: String,
}

#[derive(Deserialize)]
struct SetIsActiveRequest {
    user_id: String,
    is_active: bool,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Deserialize)]
struct MergeRequest {
    pull_request_id: String,
}

#[derive(Deserialize)]
struct ReassignRequest {
    pull_request_id: String,
    old_user_id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

// ── Routers ──────────────────────────────────────────────────────────────────

/// Routes open to `user` and `admin` tokens.
pub fn read_routes() -> Router<ApiState> {
    Router::new()
        .route("/team/get", get(get_team))
        .route("/users/getReview", get(get_user_review))
}

/// Routes that mutate state; `admin` tokens only.
pub fn write_routes() -> Router<ApiState> {
    Router::new()
        .route("/team/add", post(add_team))
        .route("/team/addMembers", post(add_team_members))
        .route("/users/setIsActive", post(set_user_is_active))
        .route("/pullRequest/create", post(create_pull_request))
        .route("/pullRequest/merge", post(merge_pull_request))
        .route("/pullRequest/reassign", post(reassign_pull_request))
}

/// Unauthenticated routes.
pub fn public_routes() -> Router<ApiState> {
    Router::new().route("/health", get(health))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /health: database liveness.
async fn health(State(state): State<ApiState>) -> Response {
    match state.transactor.ping().await {
        Ok(()) => Json(HealthResponse { status: "ok" }).into_response(),
        Err(err) => {
            log::error!("health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
                .into_response()
        }
    }
}

/// POST /team/add: create a team with its members.
async fn add_team(
    State(state): State<ApiState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<Team>), ApiErr> {
    let Json(team) = payload?;
    require(&team.team_name, "team_name")?;
    require_members(&team.members)?;

    let team = state.teams.add_team(team).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// POST /team/addMembers: upsert members into an existing team.
async fn add_team_members(
    State(state): State<ApiState>,
    payload: Result<Json<AddMembersRequest>, JsonRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Json(req) = payload?;
    require(&req.team_name, "team_name")?;
    require_members(&req.members)?;

    let team = state.teams.add_members(req.team_name, req.members).await?;
    Ok(Json(team))
}

/// GET /team/get?team_name=X: a team and its members.
async fn get_team(
    State(state): State<ApiState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<Team>, ApiErr> {
    let Query(query) = query?;
    require(&query.team_name, "team_name")?;

    let team = state.teams.get_team(query.team_name).await?;
    Ok(Json(team))
}

/// POST /users/setIsActive: toggle a user's active flag.
async fn set_user_is_active(
    State(state): State<ApiState>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> Result<Json<User>, ApiErr> {
    let Json(req) = payload?;
    require(&req.user_id, "user_id")?;

    let user = state
        .users
        .set_user_is_active(req.user_id, req.is_active)
        .await?;
    Ok(Json(user))
}

/// GET /users/getReview?user_id=X: pull requests the user reviews.
async fn get_user_review(
    State(state): State<ApiState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<UserReviews>, ApiErr> {
    let Query(query) = query?;
    require(&query.user_id, "user_id")?;

    let reviews = state.pull_requests.get_user_review(query.user_id).await?;
    Ok(Json(reviews))
}

/// POST /pullRequest/create: open a pull request with reviewers.
async fn create_pull_request(
    State(state): State<ApiState>,
    payload: Result<Json<NewPullRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PullRequest>), ApiErr> {
    let Json(req) = payload?;
    require(&req.pull_request_id, "pull_request_id")?;
    require(&req.pull_request_name, "pull_request_name")?;
    require(&req.author_id, "author_id")?;

    let pr = state.pull_requests.create(req).await?;
    Ok((StatusCode::CREATED, Json(pr)))
}

/// POST /pullRequest/merge: mark a pull request as merged.
async fn merge_pull_request(
    State(state): State<ApiState>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<PullRequest>, ApiErr> {
    let Json(req) = payload?;
    require(&req.pull_request_id, "pull_request_id")?;

    let pr = state.pull_requests.merge(req.pull_request_id).await?;
    Ok(Json(pr))
}

/// POST /pullRequest/reassign: replace one reviewer.
async fn reassign_pull_request(
    State(state): State<ApiState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> Result<Json<Reassignment>, ApiErr> {
    let Json(req) = payload?;
    require(&req.pull_request_id, "pull_request_id")?;
    require(&req.old_user_id, "old_user_id")?;

    let result = state
        .pull_requests
        .reassign(req.pull_request_id, req.old_user_id)
        .await?;
    Ok(Json(result))
}
