use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    candidate::{Candidate, NewCandidate},
    election::{Election, NewElection},
    location::{Constituency, District, Mandal, State},
    user::User,
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Collections owned by other services, read-only here.
impl MongoCollection for User {
    const NAME: &'static str = "users";
}
impl MongoCollection for Constituency {
    const NAME: &'static str = "constituencies";
}
impl MongoCollection for Mandal {
    const NAME: &'static str = "mandals";
}
impl MongoCollection for District {
    const NAME: &'static str = "districts";
}
impl MongoCollection for State {
    const NAME: &'static str = "states";
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes are the authoritative guards for title uniqueness,
/// one candidacy per user and per party in an election, and one vote per
/// voter in an election.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Election collection.
    let title_index = IndexModel::builder()
        .keys(doc! {"title": 1})
        .options(unique.clone())
        .build();
    let calendar_index = IndexModel::builder()
        .keys(doc! {"constituency_id": 1, "election_type": 1, "status": 1})
        .build();
    let status_index = IndexModel::builder()
        .keys(doc! {"status": 1, "start_date": 1, "end_date": 1})
        .build();
    Coll::<Election>::from_db(db)
        .create_indexes([title_index, calendar_index, status_index], None)
        .await?;

    // Candidate collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "user_id": 1})
        .options(unique.clone())
        .build();
    let party_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "party_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Candidate>::from_db(db)
        .create_indexes([user_index, party_index], None)
        .await?;

    // Vote collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique)
        .build();
    let tally_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "candidate_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_indexes([voter_index, tally_index], None)
        .await?;

    Ok(())
}
