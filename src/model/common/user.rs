use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Where a user is in the identity-verification workflow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<UserStatus> for Bson {
    fn from(status: UserStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// The role carried in a user's access token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "PHEAD")]
    PartyHead,
}
