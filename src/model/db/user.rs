use serde::{Deserialize, Serialize};

use crate::model::{common::user::UserStatus, mongodb::Id};

/// The party a user leads.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: Id,
    pub name: String,
}

/// Read model of a user record, owned by the user directory.
///
/// This service never writes users; it only needs approval status, party
/// leadership and registered location.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    pub wallet_address: String,
    pub status: UserStatus,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// The party this user heads, if any.
    #[serde(default)]
    pub led_party: Option<PartyRef>,
    /// The constituency the user is registered to vote in.
    #[serde(default)]
    pub constituency_id: Option<Id>,
}

impl User {
    /// A human-readable name, falling back to the ID when no name is on record.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        if name.is_empty() {
            self.id.to_string()
        } else {
            name.to_string()
        }
    }
}
