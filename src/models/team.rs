//! Team model.

use serde::{Deserialize, Serialize};

/// A roster entry as submitted with a team and as returned by `GetTeam`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// A team together with its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team name (business key).
    pub team_name: String,

    #[serde(default)]
    pub members: Vec<TeamMember>,
}
