use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    engine::Standings,
    model::{
        api::{candidate::CandidateDescription, election::ElectionDescription, id::ApiId},
        db::user::User,
        mongodb::Id,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRequest {
    pub election_id: ApiId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateStanding {
    #[serde(flatten)]
    pub candidate: CandidateDescription,
    pub votes: u64,
}

/// Vote counts and outcome of one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ApiId,
    pub result_declared: bool,
    pub total_votes: u64,
    /// Every candidate with the highest vote count.
    pub winners: Vec<ApiId>,
    pub is_draw: bool,
    pub candidates: Vec<CandidateStanding>,
}

impl ElectionResults {
    /// Render standings, naming candidates from `users` where possible.
    pub fn new(standings: Standings, result_declared: bool, users: &[User]) -> Self {
        let by_id: HashMap<Id, &User> = users.iter().map(|u| (u.id, u)).collect();
        let is_draw = standings.is_draw();
        let total_votes = standings.total_votes();
        let Standings {
            election_id,
            tallies,
            winners,
        } = standings;
        Self {
            election_id: election_id.into(),
            result_declared,
            total_votes,
            winners: winners.into_iter().map(ApiId::from).collect(),
            is_draw,
            candidates: tallies
                .into_iter()
                .map(|tally| {
                    let user = by_id.get(&tally.candidate.user_id).copied();
                    CandidateStanding {
                        candidate: CandidateDescription::new(tally.candidate, user),
                        votes: tally.votes,
                    }
                })
                .collect(),
        }
    }
}

/// A completed election together with its standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedElection {
    #[serde(flatten)]
    pub election: ElectionDescription,
    pub results: ElectionResults,
}
