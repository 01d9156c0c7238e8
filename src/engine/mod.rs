//! The election lifecycle: creation and listings, candidacy, voting, results
//! and the status scheduler.

use std::sync::Arc;

use crate::{
    clock::Clock,
    store::{ElectionRepository, GeographyService, UserDirectory},
};

mod candidacy;
mod election;
mod result;
mod scheduler;
mod voting;

pub use candidacy::{classify_candidates, CandidacyValidator, Roster};
pub use election::ElectionService;
pub use result::{determine_winners, ResultEngine, Standings};
pub use scheduler::{ElectionScheduler, SchedulerFairing, SweepReport};
pub use voting::VotingEngine;

/// Everything the engines depend on. Managed by Rocket.
#[derive(Clone)]
pub struct Services {
    pub elections: Arc<dyn ElectionRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub geography: Arc<dyn GeographyService>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Use one store for all three data ports.
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ElectionRepository + UserDirectory + GeographyService + 'static,
    {
        Self {
            elections: store.clone(),
            users: store.clone(),
            geography: store,
            clock,
        }
    }

    pub fn election_service(&self) -> ElectionService {
        ElectionService::new(self)
    }

    pub fn candidacy(&self) -> CandidacyValidator {
        CandidacyValidator::new(self)
    }

    pub fn voting(&self) -> VotingEngine {
        VotingEngine::new(self)
    }

    pub fn results(&self) -> ResultEngine {
        ResultEngine::new(self)
    }

    pub fn scheduler(&self) -> ElectionScheduler {
        ElectionScheduler::new(self)
    }
}
