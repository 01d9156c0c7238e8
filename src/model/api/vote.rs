use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::vote::Vote};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub election_id: ApiId,
    pub candidate_id: ApiId,
}

/// Confirmation of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            election_id: vote.election_id.into(),
            candidate_id: vote.candidate_id.into(),
            created_at: vote.created_at,
        }
    }
}
