use serde::{Deserialize, Serialize};

/// What the auth collaborator tells us about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: String,
    pub name: String,
    pub email: String,
}
