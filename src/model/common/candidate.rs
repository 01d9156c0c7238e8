use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// A candidate's outcome. Only changes once, when the result is declared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Pending,
    Win,
    Lose,
}

impl Default for CandidateStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
