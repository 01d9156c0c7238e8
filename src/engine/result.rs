use std::sync::Arc;

use log::info;

use super::Services;
use crate::{
    error::{Error, Result},
    model::{
        common::{candidate::CandidateStatus, election::ElectionStatus},
        db::candidate::CandidateTally,
        mongodb::Id,
    },
    store::ElectionRepository,
};

/// Every candidate of an election with their votes, and who leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standings {
    pub election_id: Id,
    /// In registration order.
    pub tallies: Vec<CandidateTally>,
    /// All candidates sharing the highest vote count.
    pub winners: Vec<Id>,
}

impl Standings {
    pub fn new(election_id: Id, tallies: Vec<CandidateTally>) -> Self {
        let winners = determine_winners(&tallies);
        Self {
            election_id,
            tallies,
            winners,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.winners.len() > 1
    }

    pub fn total_votes(&self) -> u64 {
        self.tallies.iter().map(|t| t.votes).sum()
    }

    /// Reflect a declared result in the candidates' statuses.
    fn mark_outcomes(&mut self) {
        for tally in &mut self.tallies {
            tally.candidate.status = if self.winners.contains(&tally.candidate.id) {
                CandidateStatus::Win
            } else {
                CandidateStatus::Lose
            };
        }
    }
}

/// The IDs of every candidate with the maximal vote count, in input order.
/// Empty only if there are no candidates.
pub fn determine_winners(tallies: &[CandidateTally]) -> Vec<Id> {
    let Some(max) = tallies.iter().map(|t| t.votes).max() else {
        return Vec::new();
    };
    tallies
        .iter()
        .filter(|t| t.votes == max)
        .map(|t| t.candidate.id)
        .collect()
}

/// Tallies completed elections and declares their results.
pub struct ResultEngine {
    elections: Arc<dyn ElectionRepository>,
}

impl ResultEngine {
    pub fn new(services: &Services) -> Self {
        Self {
            elections: services.elections.clone(),
        }
    }

    /// Current standings of an election, whatever its state.
    pub async fn standings(&self, election_id: Id) -> Result<Standings> {
        let tallies = self.elections.tally(election_id).await?;
        Ok(Standings::new(election_id, tallies))
    }

    /// Declare the result of a completed election.
    ///
    /// All co-winners are marked WIN and everyone else LOSE, in one
    /// transaction together with the election's declared flag.
    pub async fn declare(&self, election_id: Id) -> Result<Standings> {
        let election = self
            .elections
            .find_election(election_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
        if election.status != ElectionStatus::Completed {
            return Err(Error::ElectionNotCompleted(election_id));
        }
        if election.result_declared {
            return Err(Error::ResultAlreadyDeclared(election_id));
        }

        let mut standings = self.standings(election_id).await?;
        if standings.tallies.is_empty() {
            return Err(Error::NoCandidates(election_id));
        }

        self.elections
            .declare_result(election_id, &standings.winners)
            .await?;
        standings.mark_outcomes();
        info!(
            "Declared result for election {election_id}: {} winner(s) from {} vote(s){}",
            standings.winners.len(),
            standings.total_votes(),
            if standings.is_draw() { ", a draw" } else { "" }
        );
        Ok(standings)
    }
}
