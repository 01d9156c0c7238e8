//! In-process store, used by tests and local tooling.
//!
//! Enforces the same uniqueness and atomicity rules as the MongoDB store.

use std::{cmp::Ordering, collections::HashMap};

use chrono::{DateTime, Utc};
use rocket::tokio::sync::Mutex;

use super::{
    ElectionFilter, ElectionRepository, ElectionSort, GeographyService, SortKey, UserDirectory,
};
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
        mongodb::Id,
    },
};

#[derive(Debug, Default)]
struct Tables {
    elections: Vec<Election>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    users: HashMap<Id, User>,
    states: HashMap<Id, State>,
    districts: HashMap<Id, District>,
    mandals: HashMap<Id, Mandal>,
    constituencies: HashMap<Id, Constituency>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the directory.
    pub async fn add_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    /// Register a constituency, creating a one-off mandal, district and
    /// state above it with derived names.
    pub async fn add_constituency(&self, name: &str) -> Id {
        let mut tables = self.tables.lock().await;
        let state = State {
            id: Id::new(),
            name: format!("{name} State"),
        };
        let district = District {
            id: Id::new(),
            name: format!("{name} District"),
            state_id: state.id,
        };
        let mandal = Mandal {
            id: Id::new(),
            name: format!("{name} Mandal"),
            district_id: district.id,
        };
        let constituency = Constituency {
            id: Id::new(),
            name: name.to_string(),
            mandal_id: mandal.id,
        };
        let id = constituency.id;
        tables.states.insert(state.id, state);
        tables.districts.insert(district.id, district);
        tables.mandals.insert(mandal.id, mandal);
        tables.constituencies.insert(constituency.id, constituency);
        id
    }

    /// Store an election as-is, bypassing creation rules.
    pub async fn put_election(&self, election: Election) {
        let mut tables = self.tables.lock().await;
        tables.elections.retain(|e| e.id != election.id);
        tables.elections.push(election);
    }

    /// Store a vote as-is, bypassing the election status check.
    pub async fn put_vote(&self, vote: NewVote) -> Vote {
        let vote = Vote { id: Id::new(), vote };
        self.tables.lock().await.votes.push(vote.clone());
        vote
    }

    /// Snapshot of a stored election.
    pub async fn election(&self, id: Id) -> Option<Election> {
        self.tables
            .lock()
            .await
            .elections
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }
}

fn compare(a: &Election, b: &Election, sort: ElectionSort) -> Ordering {
    let ordering = match sort.key {
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::StartDate => a.start_date.cmp(&b.start_date),
        SortKey::EndDate => a.end_date.cmp(&b.end_date),
        SortKey::Title => a.title.cmp(&b.title),
    }
    .then_with(|| a.id.cmp(&b.id));
    if sort.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn advance(
    tables: &mut Tables,
    from: ElectionStatus,
    to: ElectionStatus,
    now: DateTime<Utc>,
) -> u64 {
    let mut moved = 0;
    for election in tables.elections.iter_mut().filter(|e| e.status == from) {
        let due = match to {
            ElectionStatus::Ongoing => election.start_date <= now,
            ElectionStatus::Completed => election.end_date <= now,
            ElectionStatus::Upcoming => false,
        };
        if due && election.status.can_advance_to(to) {
            election.status = to;
            moved += 1;
        }
    }
    moved
}

#[rocket::async_trait]
impl ElectionRepository for MemoryStore {
    async fn create_election(&self, election: NewElection) -> Result<Election> {
        let mut tables = self.tables.lock().await;
        if tables.elections.iter().any(|e| e.title == election.title) {
            return Err(Error::Conflict(
                "Election with this title already exists".to_string(),
            ));
        }
        let election = Election {
            id: Id::new(),
            election,
        };
        tables.elections.push(election.clone());
        Ok(election)
    }

    async fn find_overlapping(
        &self,
        constituency_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        election_type: ElectionType,
    ) -> Result<Vec<Election>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .elections
            .iter()
            .filter(|e| {
                e.constituency_id == constituency_id
                    && e.election_type == election_type
                    && e.status.is_active()
                    && e.overlaps(start, end)
            })
            .cloned()
            .collect())
    }

    async fn find_election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.election(id).await)
    }

    async fn find_election_by_title(&self, title: &str) -> Result<Option<Election>> {
        let tables = self.tables.lock().await;
        Ok(tables.elections.iter().find(|e| e.title == title).cloned())
    }

    async fn list_elections(
        &self,
        filter: &ElectionFilter,
        sort: ElectionSort,
        pagination: Pagination,
    ) -> Result<Page<Election>> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<_> = tables
            .elections
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(a, b, sort));
        let total = matching.len() as u64;
        let results = matching
            .into_iter()
            .skip(pagination.skip() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(pagination.page_of(results, total))
    }

    async fn advance_upcoming_to_ongoing(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(advance(
            &mut tables,
            ElectionStatus::Upcoming,
            ElectionStatus::Ongoing,
            now,
        ))
    }

    async fn advance_ongoing_to_completed(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(advance(
            &mut tables,
            ElectionStatus::Ongoing,
            ElectionStatus::Completed,
            now,
        ))
    }

    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| c.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_candidates(&self, candidates: Vec<NewCandidate>) -> Result<Vec<Candidate>> {
        let mut tables = self.tables.lock().await;
        let mut staged: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let clash = tables.candidates.iter().chain(staged.iter()).any(|c| {
                c.election_id == candidate.election_id
                    && (c.user_id == candidate.user_id || c.party_id == candidate.party_id)
            });
            if clash {
                // Nothing from this batch has been written yet.
                return Err(Error::Conflict(
                    "Candidate already registered for this election".to_string(),
                ));
            }
            staged.push(Candidate {
                id: Id::new(),
                candidate,
            });
        }
        tables.candidates.extend(staged.iter().cloned());
        Ok(staged)
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        let open = tables.elections.iter().any(|e| {
            e.id == vote.election_id && e.status == ElectionStatus::Ongoing && !e.result_declared
        });
        if !open {
            return Err(Error::ElectionNotOngoing(vote.election_id));
        }
        if tables
            .votes
            .iter()
            .any(|v| v.voter_id == vote.voter_id && v.election_id == vote.election_id)
        {
            return Err(Error::AlreadyVoted);
        }
        let vote = Vote { id: Id::new(), vote };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn find_vote(&self, election_id: Id, voter_id: Id) -> Result<Option<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .find(|v| v.election_id == election_id && v.voter_id == voter_id)
            .cloned())
    }

    async fn count_votes(&self, election_id: Id) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.election_id == election_id)
            .count() as u64)
    }

    async fn tally(&self, election_id: Id) -> Result<Vec<CandidateTally>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| c.election_id == election_id)
            .map(|c| CandidateTally {
                candidate: c.clone(),
                votes: tables
                    .votes
                    .iter()
                    .filter(|v| v.election_id == election_id && v.candidate_id == c.id)
                    .count() as u64,
            })
            .collect())
    }

    async fn declare_result(&self, election_id: Id, winners: &[Id]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let election = tables
            .elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;
        if election.result_declared {
            return Err(Error::ResultAlreadyDeclared(election_id));
        }
        if election.status != ElectionStatus::Completed {
            return Err(Error::ElectionNotCompleted(election_id));
        }
        election.result_declared = true;
        for candidate in tables
            .candidates
            .iter_mut()
            .filter(|c| c.election_id == election_id)
        {
            candidate.status = if winners.contains(&candidate.id) {
                CandidateStatus::Win
            } else {
                CandidateStatus::Lose
            };
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl UserDirectory for MemoryStore {
    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn users_by_ids(&self, ids: &[Id]) -> Result<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn parties_by_ids(&self, ids: &[Id]) -> Result<Vec<PartyRef>> {
        let tables = self.tables.lock().await;
        let mut parties: Vec<PartyRef> = tables
            .users
            .values()
            .filter_map(|u| u.led_party.clone())
            .filter(|p| ids.contains(&p.id))
            .collect();
        parties.sort_by_key(|p| p.id);
        parties.dedup_by_key(|p| p.id);
        Ok(parties)
    }
}

#[rocket::async_trait]
impl GeographyService for MemoryStore {
    async fn constituency_path(&self, constituency_id: Id) -> Result<Option<LocationPath>> {
        let tables = self.tables.lock().await;
        let path = (|| {
            let constituency = tables.constituencies.get(&constituency_id)?;
            let mandal = tables.mandals.get(&constituency.mandal_id)?;
            let district = tables.districts.get(&mandal.district_id)?;
            let state = tables.states.get(&district.state_id)?;
            Some(LocationPath {
                constituency_id,
                constituency: constituency.name.clone(),
                mandal: mandal.name.clone(),
                district: district.name.clone(),
                state: state.name.clone(),
            })
        })();
        Ok(path)
    }
}
