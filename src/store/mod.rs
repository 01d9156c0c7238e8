//! Persistence ports and their adapters.
//!
//! The election engines only ever talk to these traits, so they can run
//! against MongoDB in production and against an in-memory store in tests.

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    model::{
        api::pagination::{Page, Pagination},
        common::election::ElectionType,
        db::{
            candidate::{Candidate, CandidateTally, NewCandidate},
            election::{Election, NewElection},
            location::LocationPath,
            user::{PartyRef, User},
            vote::{NewVote, Vote},
        },
        mongodb::Id,
    },
};

#[cfg(any(test, feature = "test-util"))]
mod memory;
mod mongo;
mod query;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{ElectionFilter, ElectionSort, SortKey};

/// Storage for elections, candidates and votes.
#[rocket::async_trait]
pub trait ElectionRepository: Send + Sync {
    /// Insert a new election. A duplicate title is a [`Conflict`](crate::error::Error::Conflict).
    async fn create_election(&self, election: NewElection) -> Result<Election>;

    /// Elections of the given type in the given constituency that are still
    /// upcoming or ongoing and whose window intersects `[start, end]`.
    async fn find_overlapping(
        &self,
        constituency_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        election_type: ElectionType,
    ) -> Result<Vec<Election>>;

    async fn find_election(&self, id: Id) -> Result<Option<Election>>;

    async fn find_election_by_title(&self, title: &str) -> Result<Option<Election>>;

    /// One page of the elections matching `filter`, in `sort` order.
    async fn list_elections(
        &self,
        filter: &ElectionFilter,
        sort: ElectionSort,
        pagination: Pagination,
    ) -> Result<Page<Election>>;

    /// Move every upcoming election whose start has passed to ongoing.
    /// Returns how many were moved.
    async fn advance_upcoming_to_ongoing(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Move every ongoing election whose end has passed to completed.
    /// Returns how many were moved.
    async fn advance_ongoing_to_completed(&self, now: DateTime<Utc>) -> Result<u64>;

    /// All candidates of an election, in registration order.
    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>>;

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>>;

    /// Insert a batch of candidates atomically: either all are stored or none.
    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>>;

    /// Record a vote. A second vote by the same voter in the same election is
    /// rejected by storage with [`AlreadyVoted`](crate::error::Error::AlreadyVoted).
    /// The election must still be ongoing with no declared result when the
    /// vote is written, or it fails with
    /// [`ElectionNotOngoing`](crate::error::Error::ElectionNotOngoing).
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    async fn find_vote(&self, election_id: Id, voter_id: Id) -> Result<Option<Vote>>;

    async fn count_votes(&self, election_id: Id) -> Result<u64>;

    /// Every candidate of the election with their vote count, zero included,
    /// in registration order.
    async fn tally(&self, election_id: Id) -> Result<Vec<CandidateTally>>;

    /// Atomically mark `winners` as WIN, every other candidate of the election
    /// as LOSE, and set the election's result-declared flag. Fails with
    /// [`ResultAlreadyDeclared`](crate::error::Error::ResultAlreadyDeclared)
    /// if the flag was already set, or
    /// [`ElectionNotCompleted`](crate::error::Error::ElectionNotCompleted) if
    /// voting hasn't closed, leaving everything untouched.
    async fn declare_result(&self, election_id: Id, winners: &[Id]) -> Result<()>;
}

/// Lookup of users, owned by the identity service.
#[rocket::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_id(&self, id: Id) -> Result<Option<User>>;

    /// Users with any of the given IDs. Unknown IDs are simply absent.
    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>>;

    /// Parties with any of the given IDs, as recorded on the users leading
    /// them. A party nobody leads does not exist.
    async fn parties_by_ids(&self, ids: &[Id]) -> Result<Vec<PartyRef>>;
}

/// Lookup of geography reference data.
#[rocket::async_trait]
pub trait GeographyService: Send + Sync {
    /// Resolve a constituency up to its state, or `None` if it doesn't exist.
    async fn constituency_path(&self, constituency_id: Id) -> Result<Option<LocationPath>>;
}
