use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::candidate::CandidateStatus, mongodb::Id};

/// Core candidate data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CandidateCore {
    pub user_id: Id,
    pub party_id: Id,
    pub election_id: Id,
    pub constituency_id: Id,
    pub description: Option<String>,
    /// Outcome, set when the result is declared.
    pub status: CandidateStatus,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// A candidate together with the number of votes cast for them.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CandidateTally {
    pub candidate: Candidate,
    pub votes: u64,
}
