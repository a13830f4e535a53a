//! User identity - the display-facing slice of a user account

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display identity of an authenticated user.
///
/// The account record itself (credentials, email, settings) lives behind
/// the user store; the real-time core only ever needs this slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserIdentity {
    /// Create a new identity without an avatar
    pub fn new(id: Uuid, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            avatar: None,
        }
    }

    /// Full display name ("First Last")
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
