use std::sync::Arc;

use log::info;

use super::Services;
use crate::{
    clock::Clock,
    error::{Error, Result},
    model::{
        common::election::ElectionStatus,
        db::{
            user::User,
            vote::{NewVote, Vote},
        },
        mongodb::Id,
    },
    store::ElectionRepository,
};

/// Records votes, one per voter per election.
pub struct VotingEngine {
    elections: Arc<dyn ElectionRepository>,
    clock: Arc<dyn Clock>,
}

impl VotingEngine {
    pub fn new(services: &Services) -> Self {
        Self {
            elections: services.elections.clone(),
            clock: services.clock.clone(),
        }
    }

    /// Cast `voter`'s vote for `candidate_id` in `election_id`.
    pub async fn cast_vote(&self, voter: &User, election_id: Id, candidate_id: Id) -> Result<Vote> {
        let election = self
            .elections
            .find_election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
        if election.status != ElectionStatus::Ongoing {
            return Err(Error::ElectionNotOngoing(election_id));
        }
        if voter.constituency_id != Some(election.constituency_id) {
            return Err(Error::ConstituencyMismatch);
        }

        // Fast path only; the unique index on (voter, election) is the real guard.
        if self
            .elections
            .find_vote(election_id, voter.id)
            .await?
            .is_some()
        {
            return Err(Error::AlreadyVoted);
        }

        match self.elections.find_candidate(candidate_id).await? {
            Some(candidate) if candidate.election_id == election_id => {}
            _ => {
                return Err(Error::CandidateNotInElection {
                    candidate: candidate_id,
                    election: election_id,
                })
            }
        }

        let vote = self
            .elections
            .insert_vote(NewVote {
                voter_id: voter.id,
                election_id,
                candidate_id,
                created_at: self.clock.now(),
            })
            .await?;
        info!("Recorded vote {} in election {election_id}", vote.id);
        Ok(vote)
    }
}
