use chrono::{DateTime, Utc};
use log::{debug, warn};
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::FindOptions,
    Client, Database,
};
use rocket::futures::TryStreamExt;

use super::{ElectionFilter, ElectionRepository, ElectionSort, GeographyService, UserDirectory};
use crate::{
    error::{Error, Result},
    model::{
        api::pagination::{Page, Pagination},
        common::{
            candidate::CandidateStatus,
            election::{ElectionStatus, ElectionType},
        },
        db::{
            candidate::{Candidate, CandidateTally, NewCandidate},
            election::{Election, NewElection},
            location::{Constituency, District, LocationPath, Mandal, State},
            user::{PartyRef, User},
            vote::{NewVote, Vote},
        },
        mongodb::{id_array, is_duplicate_key_error, Coll, Id, MongoCollection},
    },
};

/// Store backed by a MongoDB replica set.
///
/// Multi-document writes run in transactions, which need a replica set.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

fn bson_time(time: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_chrono(time)
}

fn inserted_id(id: &Bson) -> Result<Id> {
    id.as_object_id()
        .map(Id::from)
        .ok_or_else(|| Error::Internal(format!("Unexpected inserted ID: {id}")))
}

fn filter_doc(filter: &ElectionFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status {
        query.insert("status", status);
    }
    if let Some(election_type) = filter.election_type {
        query.insert("election_type", election_type);
    }
    if let Some(level) = filter.level {
        query.insert("level", level);
    }
    if let Some(constituency_id) = filter.constituency_id {
        query.insert("constituency_id", constituency_id);
    }
    if let Some(declared) = filter.result_declared {
        query.insert("result_declared", declared);
    }
    if let Some(after) = filter.ends_after {
        query.insert("end_date", doc! {"$gt": bson_time(after)});
    }
    query
}

fn sort_doc(sort: ElectionSort) -> Document {
    let direction = if sort.descending { -1 } else { 1 };
    let mut order = Document::new();
    order.insert(sort.key.field(), direction);
    order.insert("_id", direction);
    order
}

/// Read a `$sum` result, which MongoDB returns as whichever integer width fits.
fn count_field(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => *n as u64,
        Some(Bson::Int64(n)) => *n as u64,
        _ => 0,
    }
}

#[rocket::async_trait]
impl ElectionRepository for MongoStore {
    async fn create_election(&self, election: NewElection) -> Result<Election> {
        let result = self
            .coll::<NewElection>()
            .insert_one(&election, None)
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    Error::Conflict("Election with this title already exists".to_string())
                } else {
                    err.into()
                }
            })?;
        let id = inserted_id(&result.inserted_id)?;
        Ok(Election { id, election })
    }

    async fn find_overlapping(
        &self,
        constituency_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        election_type: ElectionType,
    ) -> Result<Vec<Election>> {
        let filter = doc! {
            "constituency_id": constituency_id,
            "election_type": election_type,
            "status": {"$in": [ElectionStatus::Upcoming, ElectionStatus::Ongoing]},
            "start_date": {"$lte": bson_time(end)},
            "end_date": {"$gte": bson_time(start)},
        };
        let elections = self
            .coll::<Election>()
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        Ok(elections)
    }

    async fn find_election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.coll::<Election>().find_one(id.as_doc(), None).await?)
    }

    async fn find_election_by_title(&self, title: &str) -> Result<Option<Election>> {
        Ok(self
            .coll::<Election>()
            .find_one(doc! {"title": title}, None)
            .await?)
    }

    async fn list_elections(
        &self,
        filter: &ElectionFilter,
        sort: ElectionSort,
        pagination: Pagination,
    ) -> Result<Page<Election>> {
        let elections = self.coll::<Election>();
        let query = filter_doc(filter);
        let total = elections.count_documents(query.clone(), None).await?;
        let options = FindOptions::builder()
            .sort(sort_doc(sort))
            .skip(pagination.skip())
            .limit(pagination.limit() as i64)
            .build();
        let results = elections
            .find(query, options)
            .await?
            .try_collect()
            .await?;
        Ok(pagination.page_of(results, total))
    }

    async fn advance_upcoming_to_ongoing(&self, now: DateTime<Utc>) -> Result<u64> {
        let filter = doc! {
            "status": ElectionStatus::Upcoming,
            "start_date": {"$lte": bson_time(now)},
        };
        let update = doc! {"$set": {"status": ElectionStatus::Ongoing}};
        let result = self
            .coll::<Election>()
            .update_many(filter, update, None)
            .await?;
        Ok(result.modified_count)
    }

    async fn advance_ongoing_to_completed(&self, now: DateTime<Utc>) -> Result<u64> {
        let filter = doc! {
            "status": ElectionStatus::Ongoing,
            "end_date": {"$lte": bson_time(now)},
        };
        let update = doc! {"$set": {"status": ElectionStatus::Completed}};
        let result = self
            .coll::<Election>()
            .update_many(filter, update, None)
            .await?;
        Ok(result.modified_count)
    }

    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let candidates = self
            .coll::<Candidate>()
            .find(doc! {"election_id": election_id}, options)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.coll::<Candidate>().find_one(id.as_doc(), None).await?)
    }

    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Dropping the session on error aborts the transaction.
        let result = self
            .coll::<NewCandidate>()
            .insert_many_with_session(&candidates, None, &mut session)
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    warn!("Concurrent candidacy rejected by unique index");
                    Error::Conflict("Candidate already registered for this election".to_string())
                } else {
                    err.into()
                }
            })?;
        session.commit_transaction().await?;

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let id = result
                    .inserted_ids
                    .get(&i)
                    .ok_or_else(|| Error::Internal(format!("Missing inserted ID {i}")))
                    .and_then(inserted_id)?;
                Ok(Candidate { id, candidate })
            })
            .collect()
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Touch the election so a concurrent completion or declaration
        // conflicts with this transaction instead of slipping past it.
        let open = doc! {
            "_id": vote.election_id,
            "status": ElectionStatus::Ongoing,
            "result_declared": false,
        };
        let touched = self
            .coll::<Election>()
            .update_one_with_session(open, doc! {"$inc": {"votes_cast": 1}}, None, &mut session)
            .await?;
        if touched.modified_count == 0 {
            return Err(Error::ElectionNotOngoing(vote.election_id));
        }

        let result = self
            .coll::<NewVote>()
            .insert_one_with_session(&vote, None, &mut session)
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    Error::AlreadyVoted
                } else {
                    err.into()
                }
            })?;
        session.commit_transaction().await?;

        let id = inserted_id(&result.inserted_id)?;
        Ok(Vote { id, vote })
    }

    async fn find_vote(&self, election_id: Id, voter_id: Id) -> Result<Option<Vote>> {
        let filter = doc! {
            "election_id": election_id,
            "voter_id": voter_id,
        };
        Ok(self.coll::<Vote>().find_one(filter, None).await?)
    }

    async fn count_votes(&self, election_id: Id) -> Result<u64> {
        Ok(self
            .coll::<Vote>()
            .count_documents(doc! {"election_id": election_id}, None)
            .await?)
    }

    async fn tally(&self, election_id: Id) -> Result<Vec<CandidateTally>> {
        let pipeline = [
            doc! {"$match": {"election_id": election_id}},
            doc! {"$group": {"_id": "$candidate_id", "votes": {"$sum": 1}}},
        ];
        let groups: Vec<Document> = self
            .coll::<Vote>()
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;

        let candidates = self.candidates_for_election(election_id).await?;
        let tallies = candidates
            .into_iter()
            .map(|candidate| {
                let votes = groups
                    .iter()
                    .find(|group| group.get_object_id("_id").ok() == Some(*candidate.id))
                    .map(|group| count_field(group, "votes"))
                    .unwrap_or(0);
                CandidateTally { candidate, votes }
            })
            .collect();
        Ok(tallies)
    }

    async fn declare_result(&self, election_id: Id, winners: &[Id]) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Claim the declaration; only one caller can flip the flag.
        let claim = doc! {
            "_id": election_id,
            "status": ElectionStatus::Completed,
            "result_declared": false,
        };
        let update = doc! {"$set": {"result_declared": true}};
        let claimed = self
            .coll::<Election>()
            .update_one_with_session(claim, update, None, &mut session)
            .await?;
        if claimed.modified_count == 0 {
            let election = self
                .coll::<Election>()
                .find_one_with_session(election_id.as_doc(), None, &mut session)
                .await?;
            return Err(match election {
                None => Error::not_found(format!("Election with ID '{election_id}'")),
                Some(e) if e.result_declared => Error::ResultAlreadyDeclared(election_id),
                Some(_) => Error::ElectionNotCompleted(election_id),
            });
        }

        let candidates = self.coll::<Candidate>();
        let win = doc! {"election_id": election_id, "_id": {"$in": id_array(winners)}};
        candidates
            .update_many_with_session(
                win,
                doc! {"$set": {"status": CandidateStatus::Win}},
                None,
                &mut session,
            )
            .await?;
        let lose = doc! {"election_id": election_id, "_id": {"$nin": id_array(winners)}};
        candidates
            .update_many_with_session(
                lose,
                doc! {"$set": {"status": CandidateStatus::Lose}},
                None,
                &mut session,
            )
            .await?;

        session.commit_transaction().await?;
        debug!("Declared result for election {election_id}");
        Ok(())
    }
}

#[rocket::async_trait]
impl UserDirectory for MongoStore {
    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        Ok(self.coll::<User>().find_one(id.as_doc(), None).await?)
    }

    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>> {
        let users = self
            .coll::<User>()
            .find(doc! {"_id": {"$in": id_array(ids)}}, None)
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn parties_by_ids(&self, ids: &[Id]) -> Result<Vec<PartyRef>> {
        let leaders: Vec<User> = self
            .coll::<User>()
            .find(doc! {"led_party.id": {"$in": id_array(ids)}}, None)
            .await?
            .try_collect()
            .await?;
        let mut parties: Vec<PartyRef> = leaders
            .into_iter()
            .filter_map(|u| u.led_party)
            .collect();
        parties.sort_by_key(|p| p.id);
        parties.dedup_by_key(|p| p.id);
        Ok(parties)
    }
}

#[rocket::async_trait]
impl GeographyService for MongoStore {
    async fn constituency_path(&self, constituency_id: Id) -> Result<Option<LocationPath>> {
        let Some(constituency) = self
            .coll::<Constituency>()
            .find_one(constituency_id.as_doc(), None)
            .await?
        else {
            return Ok(None);
        };
        let Some(mandal) = self
            .coll::<Mandal>()
            .find_one(constituency.mandal_id.as_doc(), None)
            .await?
        else {
            return Ok(None);
        };
        let Some(district) = self
            .coll::<District>()
            .find_one(mandal.district_id.as_doc(), None)
            .await?
        else {
            return Ok(None);
        };
        let Some(state) = self
            .coll::<State>()
            .find_one(district.state_id.as_doc(), None)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(LocationPath {
            constituency_id,
            constituency: constituency.name,
            mandal: mandal.name,
            district: district.name,
            state: state.name,
        }))
    }
}
